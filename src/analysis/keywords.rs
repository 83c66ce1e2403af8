//! Keyword tables used to classify bios

/// Convention/event terms searched in bio and nickname when writing the
/// event-match file
pub const EVENT_KEYWORDS: &[&str] = &[
    "漫展", "CP", "BW", "CJ", "COMICUP", "签售", "返图", "约拍", "约片",
    "行程", "场照", "coser", "cos", "出cos", "摊位", "同人展",
    "萤火虫", "国际动漫节", "IDO", "CICF", "AGF", "CCG", "XYCC",
    "魔都同人祭", "广州", "上海", "北京", "成都", "杭州", "深圳",
    "南京", "武汉", "重庆", "长沙",
];

/// Terms that mark a bio as listing an event schedule
pub const SCHEDULE_KEYWORDS: &[&str] = &[
    // event names
    "漫展", "签售", "萤火虫", "only", "fes", "嘉年华", "快闪",
    "世界线", "次元", "动漫", "摄影会", "一日店长", "签赠",
    "GameFes", "ComicFes", "ICG", "IDO", "CP展", "BW", "CJ",
    "SSCA", "IJOY", "WF展", "FC展", "ACG", "DC", "mars",
    "NewEra", "冲击波", "梦乡", "梦幻星",
    // itinerary
    "行程", "✈️", "🌟程", "线下",
];

/// Terms that make a single bio line a schedule line on their own
pub const SCHEDULE_LINE_KEYWORDS: &[&str] = &["行程", "线下", "签售", "漫展"];

/// Category label and the terms that select it
pub const CATEGORIES: &[(&str, &[&str])] = &[
    ("Coser", &["coser", "cos", "cosplay", "三坑", "lolita", "汉服", "jk"]),
    ("Photographer", &["摄影", "约拍", "拍摄"]),
    ("Streamer", &["主播", "直播"]),
    ("Gaming", &["游戏", "电竞", "ow", "守望", "原神", "崩坏"]),
    ("Finance", &["投资", "交易", "金融", "基金", "财经"]),
    ("Official", &["官方", "官号"]),
    ("IP/Stickers", &["表情包", "原创角色", "ip"]),
];

pub const CATEGORY_OTHER: &str = "Other";
pub const CATEGORY_UNKNOWN: &str = "Unknown";
