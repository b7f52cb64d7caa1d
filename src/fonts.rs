use fontdb::Database;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Families able to render CJK labels, most preferred first.
pub const CJK_FALLBACK_FAMILIES: [&str; 9] = [
    "Microsoft JhengHei",
    "SimHei",
    "SimSun",
    "Noto Sans CJK TC",
    "Noto Sans CJK SC",
    "Source Han Sans TC",
    "PingFang TC",
    "WenQuanYi Zen Hei",
    "Droid Sans Fallback",
];

/// Latin-only families used when no CJK family is installed.
pub const LATIN_FALLBACK_FAMILIES: [&str; 4] = ["DejaVu Sans", "Liberation Sans", "Arial", "Noto Sans"];

/// Font files probed on top of the system font directories.
pub const CJK_FALLBACK_FILES: [&str; 5] = [
    "C:/Windows/Fonts/msjh.ttc",
    "C:/Windows/Fonts/msjhbd.ttc",
    "C:/Windows/Fonts/simhei.ttf",
    "C:/Windows/Fonts/simsun.ttc",
    "/usr/share/fonts/truetype/droid/DroidSansFallbackFull.ttf",
];

pub const GENERIC_FAMILY: &str = "sans-serif";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontChoice {
    pub family: String,
    /// True when no preferred or CJK-capable family was installed.
    pub degraded: bool,
}

impl FontChoice {
    /// Value for an SVG `font-family` attribute, always ending in the generic family.
    pub fn css_family(&self) -> String {
        if self.family == GENERIC_FAMILY {
            GENERIC_FAMILY.to_string()
        } else {
            format!("'{}', {GENERIC_FAMILY}", self.family.replace('\'', ""))
        }
    }
}

/// System fonts plus whichever of `extra_files` and [`CJK_FALLBACK_FILES`] exist.
/// The generic sans-serif family is pointed at an installed face.
pub fn load_font_database(extra_files: &[PathBuf]) -> Database {
    let mut db = Database::new();
    db.load_system_fonts();
    let candidates = extra_files
        .iter()
        .map(PathBuf::as_path)
        .chain(CJK_FALLBACK_FILES.iter().map(Path::new));
    for path in candidates {
        if !path.is_file() {
            continue;
        }
        if let Err(err) = db.load_font_file(path) {
            debug!(path = %path.display(), error = %err, "skipping unreadable font file");
        }
    }
    if let Some(family) = generic_sans_target(&installed_families(&db)) {
        debug!(family = %family, "mapping sans-serif");
        db.set_sans_serif_family(family);
    }
    db
}

/// Family names of every loaded face, sorted.
pub fn installed_families(db: &Database) -> BTreeSet<String> {
    db.faces()
        .flat_map(|face| face.families.iter().map(|(name, _)| name.clone()))
        .collect()
}

/// Picks the first of `preferred`, then [`CJK_FALLBACK_FAMILIES`], that is
/// installed. Otherwise any installed family is used and degraded rendering
/// is logged.
pub fn resolve_family(db: &Database, preferred: &[String]) -> FontChoice {
    choose_family(&installed_families(db), preferred)
}

fn find_installed<'a>(installed: &'a BTreeSet<String>, family: &str) -> Option<&'a String> {
    installed.iter().find(|name| name.eq_ignore_ascii_case(family))
}

/// Replacement for fontdb's default sans-serif mapping (Arial) when Arial is missing.
fn generic_sans_target(installed: &BTreeSet<String>) -> Option<String> {
    if find_installed(installed, "Arial").is_some() {
        return None;
    }
    CJK_FALLBACK_FAMILIES
        .iter()
        .chain(LATIN_FALLBACK_FAMILIES.iter())
        .find_map(|family| find_installed(installed, family))
        .or_else(|| installed.iter().next())
        .cloned()
}

fn choose_family(installed: &BTreeSet<String>, preferred: &[String]) -> FontChoice {
    let candidates = preferred
        .iter()
        .map(String::as_str)
        .chain(CJK_FALLBACK_FAMILIES.iter().copied());
    for family in candidates {
        if let Some(name) = find_installed(installed, family) {
            debug!(family = %name, "resolved label font");
            return FontChoice {
                family: name.clone(),
                degraded: false,
            };
        }
    }
    let family = LATIN_FALLBACK_FAMILIES
        .iter()
        .find_map(|family| find_installed(installed, family))
        .or_else(|| installed.iter().next())
        .cloned()
        .unwrap_or_else(|| GENERIC_FAMILY.to_string());
    warn!(family = %family, "no CJK-capable font found, labels may not render non-Latin text");
    FontChoice {
        family,
        degraded: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn installed(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn preferred_family_wins() {
        let choice = choose_family(
            &installed(&["SimHei", "My Brand Font"]),
            &["my brand font".to_string()],
        );
        assert_eq!(choice.family, "My Brand Font");
        assert!(!choice.degraded);
    }

    #[test]
    fn falls_through_priority_list() {
        let choice = choose_family(&installed(&["DejaVu Sans", "Noto Sans CJK TC"]), &[]);
        assert_eq!(choice.family, "Noto Sans CJK TC");
        assert!(!choice.degraded);
        assert_eq!(choice.css_family(), "'Noto Sans CJK TC', sans-serif");
    }

    #[test]
    fn latin_only_font_is_degraded() {
        let choice = choose_family(&installed(&["Comic Sans MS", "DejaVu Sans"]), &[]);
        assert_eq!(choice.family, "DejaVu Sans");
        assert!(choice.degraded);
        assert_eq!(choice.css_family(), "'DejaVu Sans', sans-serif");
    }

    #[test]
    fn unknown_installed_font_is_used_before_generic() {
        let choice = choose_family(&installed(&["Comic Sans MS"]), &["Nope".to_string()]);
        assert_eq!(choice.family, "Comic Sans MS");
        assert!(choice.degraded);
    }

    #[test]
    fn no_fonts_degrade_to_generic() {
        let choice = choose_family(&BTreeSet::new(), &[]);
        assert_eq!(choice.family, GENERIC_FAMILY);
        assert!(choice.degraded);
        assert_eq!(choice.css_family(), "sans-serif");
    }

    #[test]
    fn sans_serif_is_remapped_only_without_arial() {
        assert_eq!(generic_sans_target(&installed(&["Arial", "SimHei"])), None);
        assert_eq!(
            generic_sans_target(&installed(&["Comic Sans MS", "DejaVu Sans", "SimHei"])),
            Some("SimHei".to_string())
        );
        assert_eq!(
            generic_sans_target(&installed(&["Comic Sans MS", "DejaVu Sans"])),
            Some("DejaVu Sans".to_string())
        );
        assert_eq!(generic_sans_target(&installed(&["Zapfino", "Comic Sans MS"])), Some("Comic Sans MS".to_string()));
        assert_eq!(generic_sans_target(&BTreeSet::new()), None);
    }

    #[test]
    fn database_loads_without_candidate_files() {
        let db = load_font_database(&[PathBuf::from("/no/such/font.ttf")]);
        let choice = resolve_family(&db, &[]);
        assert!(!choice.family.is_empty());
    }
}
