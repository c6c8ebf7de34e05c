//! Built-in corpus and test battery
//!
//! Ten informal categories of ten words each, in a fixed order. The order
//! decides how similarity ties are broken in reference rankings, so it must
//! not be shuffled.

use crate::types::TestCaseSpec;

const ANIMALS: &[&str] = &[
    "cat", "dog", "elephant", "giraffe", "lion", "tiger", "bear", "wolf", "fox", "deer",
];

const FOOD: &[&str] = &[
    "pizza", "burger", "sushi", "pasta", "bread", "cheese", "apple", "banana", "orange", "grape",
];

// "orange" is already listed under food.
const COLORS: &[&str] = &[
    "red", "blue", "green", "yellow", "purple", "pink", "brown", "black", "white",
];

const WEATHER: &[&str] = &[
    "sunny", "rainy", "cloudy", "windy", "snowy", "stormy", "foggy", "hot", "cold", "warm",
];

const EMOTIONS: &[&str] = &[
    "happy", "sad", "angry", "excited", "nervous", "calm", "joyful", "worried", "peaceful",
    "scared",
];

const TECHNOLOGY: &[&str] = &[
    "computer", "phone", "tablet", "laptop", "mouse", "keyboard", "monitor", "printer", "camera",
    "speaker",
];

const SPORTS: &[&str] = &[
    "soccer",
    "basketball",
    "baseball",
    "football",
    "tennis",
    "golf",
    "hockey",
    "swimming",
    "running",
    "boxing",
];

const MUSIC: &[&str] = &[
    "guitar", "piano", "drums", "violin", "trumpet", "flute", "saxophone", "harp", "cello",
    "clarinet",
];

const NATURE: &[&str] = &[
    "mountain", "river", "ocean", "forest", "desert", "lake", "valley", "hill", "beach", "island",
];

const TRANSPORTATION: &[&str] = &[
    "car",
    "bus",
    "train",
    "plane",
    "boat",
    "bicycle",
    "motorcycle",
    "truck",
    "subway",
    "helicopter",
];

/// Category name and its words, in corpus order.
pub const CATEGORIES: &[(&str, &[&str])] = &[
    ("animals", ANIMALS),
    ("food", FOOD),
    ("colors", COLORS),
    ("weather", WEATHER),
    ("emotions", EMOTIONS),
    ("technology", TECHNOLOGY),
    ("sports", SPORTS),
    ("music", MUSIC),
    ("nature", NATURE),
    ("transportation", TRANSPORTATION),
];

/// Target words of the built-in battery.
pub const BUILTIN_TARGETS: &[&str] = &["cat", "computer", "sunny", "pizza", "guitar"];

/// All built-in corpus words, flattened in category order.
pub fn builtin_words() -> Vec<&'static str> {
    CATEGORIES
        .iter()
        .flat_map(|(_, words)| words.iter().copied())
        .collect()
}

/// The built-in test battery.
pub fn builtin_test_cases() -> Vec<TestCaseSpec> {
    BUILTIN_TARGETS
        .iter()
        .map(|target| TestCaseSpec::new(*target))
        .collect()
}
