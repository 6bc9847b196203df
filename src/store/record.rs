//! Record naming rules
//!
//! A record's file name is its identity: `{kind}-{event}-{subject}[...].{ext}`.

use super::StoreError;

/// Config roles that get a backup copy before being overwritten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigRole {
    Pit,
    Match,
    Coach,
    SmartStats,
    Whiteboard,
}

impl ConfigRole {
    pub const ALL: [ConfigRole; 5] = [
        ConfigRole::Pit,
        ConfigRole::Match,
        ConfigRole::Coach,
        ConfigRole::SmartStats,
        ConfigRole::Whiteboard,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            ConfigRole::Pit => "-pit",
            ConfigRole::Match => "-match",
            ConfigRole::Coach => "-coach",
            ConfigRole::SmartStats => "-smart_stats",
            ConfigRole::Whiteboard => "-whiteboard",
        }
    }

    /// Role of a `config-{year}-...{role}.json` name
    pub fn of(name: &str) -> Option<ConfigRole> {
        let stem = name.strip_suffix(".json")?;
        let year = stem.strip_prefix("config-")?;
        let bytes = year.as_bytes();
        if bytes.len() < 5 || bytes[4] != b'-' || !bytes[..4].iter().all(u8::is_ascii_digit) {
            return None;
        }
        Self::ALL.into_iter().find(|role| stem.ends_with(role.suffix()))
    }
}

/// Legacy record kinds listed by the `get*Names` endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Pit,
    Match,
    Note,
    Image,
}

impl RecordKind {
    pub fn prefix(self) -> &'static str {
        match self {
            RecordKind::Pit => "pit-",
            RecordKind::Match => "match-",
            RecordKind::Note => "note-",
            RecordKind::Image => "image-",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            RecordKind::Image => ".png",
            _ => ".json",
        }
    }

    pub fn matches(self, name: &str) -> bool {
        name.starts_with(self.prefix()) && name.ends_with(self.extension())
    }
}

/// Reject anything that is not a single, plain path component
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
    {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

pub fn is_picture(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".png") || lower.ends_with(".jpg")
}

/// Where the previous version of a config record is kept
pub fn backup_name(name: &str) -> String {
    format!("{}.bak", name)
}

/// Split `{subject}-{n}.{ext}` into subject and picture number
pub fn picture_parts(name: &str) -> Option<(&str, Option<u64>)> {
    if !is_picture(name) {
        return None;
    }
    let stem = &name[..name.len() - 4];
    match stem.rsplit_once('-') {
        Some((subject, n)) if !subject.is_empty() => Some((subject, n.parse().ok())),
        _ => Some((stem, None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_role_detection() {
        assert_eq!(ConfigRole::of("config-2024-pit.json"), Some(ConfigRole::Pit));
        assert_eq!(ConfigRole::of("config-2024-match.json"), Some(ConfigRole::Match));
        assert_eq!(
            ConfigRole::of("config-2024-smart_stats.json"),
            Some(ConfigRole::SmartStats)
        );
        assert_eq!(ConfigRole::of("config-2024-coach.json"), Some(ConfigRole::Coach));
        assert_eq!(
            ConfigRole::of("config-2024-whiteboard.json"),
            Some(ConfigRole::Whiteboard)
        );
        assert_eq!(ConfigRole::of("config-settings.json"), None);
        assert_eq!(ConfigRole::of("config-2024-pit.png"), None);
        assert_eq!(ConfigRole::of("match-2024miket-1-111.json"), None);
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("pit-2024miket-111.json").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("../etc/passwd").is_err());
        assert!(validate_name("nested/file.json").is_err());
    }

    #[test]
    fn test_picture_parts() {
        assert_eq!(picture_parts("111-0.png"), Some(("111", Some(0))));
        assert_eq!(picture_parts("111-12.jpg"), Some(("111", Some(12))));
        assert_eq!(picture_parts("avatar.png"), Some(("avatar", None)));
        assert_eq!(picture_parts("111-0.json"), None);
    }

    #[test]
    fn test_record_kind_matching() {
        assert!(RecordKind::Pit.matches("pit-2024miket-111.json"));
        assert!(!RecordKind::Pit.matches("pit-2024miket-111.png"));
        assert!(RecordKind::Image.matches("image-2024miket-111.png"));
        assert!(!RecordKind::Match.matches("matches-2024miket.json"));
    }
}
