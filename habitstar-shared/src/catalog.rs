//! Fixed catalogs: stickers children can unlock, profile avatars, task
//! templates and suggested task icons.

use crate::domain::Frequency;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sticker {
    pub id: &'static str,
    pub emoji: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Avatar {
    pub id: &'static str,
    pub emoji: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskTemplate {
    pub title: &'static str,
    pub icon: &'static str,
    pub frequency: Frequency,
}

pub const STICKERS: [Sticker; 15] = [
    Sticker { id: "rainbow", emoji: "🌈", name: "Rainbow" },
    Sticker { id: "star", emoji: "⭐", name: "Gold Star" },
    Sticker { id: "rocket", emoji: "🚀", name: "Rocket" },
    Sticker { id: "trophy", emoji: "🏆", name: "Trophy" },
    Sticker { id: "crown", emoji: "👑", name: "Crown" },
    Sticker { id: "heart", emoji: "❤️", name: "Heart" },
    Sticker { id: "diamond", emoji: "💎", name: "Diamond" },
    Sticker { id: "fire", emoji: "🔥", name: "Fire" },
    Sticker { id: "sparkles", emoji: "✨", name: "Sparkles" },
    Sticker { id: "balloon", emoji: "🎈", name: "Balloon" },
    Sticker { id: "cake", emoji: "🎂", name: "Cake" },
    Sticker { id: "sun", emoji: "☀️", name: "Sun" },
    Sticker { id: "butterfly", emoji: "🦋", name: "Butterfly" },
    Sticker { id: "flower", emoji: "🌸", name: "Flower" },
    Sticker { id: "medal", emoji: "🏅", name: "Medal" },
];

pub const AVATARS: [Avatar; 12] = [
    Avatar { id: "bear", emoji: "🐻", name: "Bear" },
    Avatar { id: "cat", emoji: "🐱", name: "Cat" },
    Avatar { id: "dog", emoji: "🐶", name: "Dog" },
    Avatar { id: "rabbit", emoji: "🐰", name: "Rabbit" },
    Avatar { id: "panda", emoji: "🐼", name: "Panda" },
    Avatar { id: "lion", emoji: "🦁", name: "Lion" },
    Avatar { id: "fox", emoji: "🦊", name: "Fox" },
    Avatar { id: "koala", emoji: "🐨", name: "Koala" },
    Avatar { id: "unicorn", emoji: "🦄", name: "Unicorn" },
    Avatar { id: "owl", emoji: "🦉", name: "Owl" },
    Avatar { id: "penguin", emoji: "🐧", name: "Penguin" },
    Avatar { id: "monkey", emoji: "🐵", name: "Monkey" },
];

pub const TASK_TEMPLATES: [TaskTemplate; 5] = [
    TaskTemplate { title: "Brush teeth", icon: "🦷", frequency: Frequency::Daily },
    TaskTemplate { title: "Clean toys", icon: "🧸", frequency: Frequency::Daily },
    TaskTemplate { title: "Read a book", icon: "📚", frequency: Frequency::Daily },
    TaskTemplate { title: "Sleep on time", icon: "😴", frequency: Frequency::Daily },
    TaskTemplate { title: "Eat fruits", icon: "🍎", frequency: Frequency::Daily },
];

pub const TASK_ICONS: [&str; 15] = [
    "🦷", "🧸", "📚", "😴", "🍎", "🥕", "🚿", "👕", "🎨", "🏃", "🧹", "🙏", "💧", "🎵", "🌱",
];

pub fn avatar(id: &str) -> Option<&'static Avatar> {
    AVATARS.iter().find(|a| a.id == id)
}

pub fn task_template(index: usize) -> Option<&'static TaskTemplate> {
    TASK_TEMPLATES.get(index)
}
