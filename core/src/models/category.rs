use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Point-of-interest categories served by the upstream API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Aed,
    Hospital,
    FreeWifi,
    Evacuation,
    Toilet,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Aed,
        Category::Hospital,
        Category::FreeWifi,
        Category::Evacuation,
        Category::Toilet,
    ];

    /// Identifier stored in favorite records
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Aed => "aed",
            Category::Hospital => "hospital",
            Category::FreeWifi => "freewifi",
            Category::Evacuation => "evacuation",
            Category::Toilet => "toilet",
        }
    }

    /// Path segment of the upstream endpoint
    pub fn endpoint(&self) -> &'static str {
        match self {
            Category::Aed => "aed",
            Category::Hospital => "hospital",
            Category::FreeWifi => "public_wireless_lan",
            Category::Evacuation => "evacuation_space",
            Category::Toilet => "public_toilet",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Aed => "AED",
            Category::Hospital => "Medical facility",
            Category::FreeWifi => "Public wireless LAN access point",
            Category::Evacuation => "Designated emergency evacuation site",
            Category::Toilet => "Public toilet",
        }
    }

    /// Marker colour as RGB
    pub fn marker_rgb(&self) -> (u8, u8, u8) {
        match self {
            Category::Aed => (0xe7, 0x4c, 0x3c),
            Category::Hospital => (0x34, 0x98, 0xdb),
            Category::FreeWifi => (0x27, 0xae, 0x60),
            Category::Evacuation => (0xf3, 0x9c, 0x12),
            Category::Toilet => (0x9b, 0x59, 0xb6),
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Aed
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aed" => Ok(Category::Aed),
            "hospital" => Ok(Category::Hospital),
            "freewifi" => Ok(Category::FreeWifi),
            "evacuation" => Ok(Category::Evacuation),
            "toilet" => Ok(Category::Toilet),
            other => Err(crate::Error::InvalidInput(format!("Unsupported category: {}", other))),
        }
    }
}
