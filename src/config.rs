use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use directories::BaseDirs;
use serde::de::Deserializer;
use serde::Deserialize;
use tracing::{info, warn};

use crate::db;
use crate::view::{DEFAULT_TWITTER_URL, FAVORITE_GLYPH, NOT_FAVORITE_GLYPH};

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_NAME: &str = "rolodex";

#[derive(Debug, Clone)]
pub struct Config {
    /// File the configuration was read from, if any
    pub config_path: Option<PathBuf>,
    pub db_path: PathBuf,
    pub links: LinksConfig,
    pub store: StoreConfig,
    pub keys: Keys,
    pub ui: UiConfig,
}

#[derive(Debug, Clone)]
pub struct LinksConfig {
    /// Profile URL template; `{handle}` is replaced with the twitter handle
    pub twitter: String,
}

#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Delay applied before every store call
    pub latency: Duration,
}

// =============================================================================
// Key Bindings - Context-aware with multiple bindings per action
// =============================================================================

/// All key bindings organized by context
#[derive(Debug, Clone)]
pub struct Keys {
    pub global: GlobalKeys,
    /// Keys on the contact detail screen
    pub detail: DetailKeys,
    /// Keys for the confirmation modal
    pub modal: ModalKeys,
    /// Keys for moving around the edit form
    pub form: FormKeys,
    /// Keys while a field is being typed into
    pub editor: EditorKeys,
}

#[derive(Debug, Clone)]
pub struct GlobalKeys {
    pub quit: Vec<String>,
    pub refresh: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DetailKeys {
    pub favorite: Vec<String>,
    pub edit: Vec<String>,
    pub delete: Vec<String>,
    /// Open the twitter link in the system browser
    pub open_link: Vec<String>,
    pub next: Vec<String>,
    pub prev: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ModalKeys {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FormKeys {
    pub next: Vec<String>,
    pub prev: Vec<String>,
    pub edit: Vec<String>,
    pub save: Vec<String>,
    pub cancel: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EditorKeys {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

impl Default for Keys {
    fn default() -> Self {
        Self {
            global: GlobalKeys::default(),
            detail: DetailKeys::default(),
            modal: ModalKeys::default(),
            form: FormKeys::default(),
            editor: EditorKeys::default(),
        }
    }
}

impl Default for GlobalKeys {
    fn default() -> Self {
        Self {
            quit: vec!["q".into()],
            refresh: vec!["F5".into()],
        }
    }
}

impl Default for DetailKeys {
    fn default() -> Self {
        Self {
            favorite: vec!["f".into(), "Space".into()],
            edit: vec!["e".into()],
            delete: vec!["d".into(), "Delete".into()],
            open_link: vec!["o".into()],
            next: vec!["j".into(), "Down".into()],
            prev: vec!["k".into(), "Up".into()],
        }
    }
}

impl Default for ModalKeys {
    fn default() -> Self {
        Self {
            confirm: vec!["Enter".into(), "y".into()],
            cancel: vec!["Escape".into(), "n".into(), "q".into()],
        }
    }
}

impl Default for FormKeys {
    fn default() -> Self {
        Self {
            next: vec!["j".into(), "Down".into(), "Tab".into()],
            prev: vec!["k".into(), "Up".into(), "Backtab".into()],
            edit: vec!["e".into(), "Enter".into()],
            save: vec!["s".into(), "F2".into()],
            cancel: vec!["Escape".into()],
        }
    }
}

impl Default for EditorKeys {
    fn default() -> Self {
        Self {
            confirm: vec!["Enter".into()],
            cancel: vec!["Escape".into()],
        }
    }
}

// =============================================================================
// Serde deserialization types (support both single string and array)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum KeyBinding {
    Single(String),
    Multiple(Vec<String>),
}

impl KeyBinding {
    fn into_vec(self) -> Vec<String> {
        match self {
            KeyBinding::Single(s) => vec![s],
            KeyBinding::Multiple(v) => v,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct KeysFile {
    global: GlobalKeysFile,
    detail: DetailKeysFile,
    modal: ModalKeysFile,
    form: FormKeysFile,
    editor: EditorKeysFile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GlobalKeysFile {
    quit: KeyBinding,
    refresh: KeyBinding,
}

impl Default for GlobalKeysFile {
    fn default() -> Self {
        let defaults = GlobalKeys::default();
        Self {
            quit: KeyBinding::Multiple(defaults.quit),
            refresh: KeyBinding::Multiple(defaults.refresh),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DetailKeysFile {
    favorite: KeyBinding,
    edit: KeyBinding,
    delete: KeyBinding,
    open_link: KeyBinding,
    next: KeyBinding,
    prev: KeyBinding,
}

impl Default for DetailKeysFile {
    fn default() -> Self {
        let defaults = DetailKeys::default();
        Self {
            favorite: KeyBinding::Multiple(defaults.favorite),
            edit: KeyBinding::Multiple(defaults.edit),
            delete: KeyBinding::Multiple(defaults.delete),
            open_link: KeyBinding::Multiple(defaults.open_link),
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ModalKeysFile {
    confirm: KeyBinding,
    cancel: KeyBinding,
}

impl Default for ModalKeysFile {
    fn default() -> Self {
        let defaults = ModalKeys::default();
        Self {
            confirm: KeyBinding::Multiple(defaults.confirm),
            cancel: KeyBinding::Multiple(defaults.cancel),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FormKeysFile {
    next: KeyBinding,
    prev: KeyBinding,
    edit: KeyBinding,
    save: KeyBinding,
    cancel: KeyBinding,
}

impl Default for FormKeysFile {
    fn default() -> Self {
        let defaults = FormKeys::default();
        Self {
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
            edit: KeyBinding::Multiple(defaults.edit),
            save: KeyBinding::Multiple(defaults.save),
            cancel: KeyBinding::Multiple(defaults.cancel),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct EditorKeysFile {
    confirm: KeyBinding,
    cancel: KeyBinding,
}

impl Default for EditorKeysFile {
    fn default() -> Self {
        let defaults = EditorKeys::default();
        Self {
            confirm: KeyBinding::Multiple(defaults.confirm),
            cancel: KeyBinding::Multiple(defaults.cancel),
        }
    }
}

impl From<KeysFile> for Keys {
    fn from(file: KeysFile) -> Self {
        Self {
            global: GlobalKeys {
                quit: file.global.quit.into_vec(),
                refresh: file.global.refresh.into_vec(),
            },
            detail: DetailKeys {
                favorite: file.detail.favorite.into_vec(),
                edit: file.detail.edit.into_vec(),
                delete: file.detail.delete.into_vec(),
                open_link: file.detail.open_link.into_vec(),
                next: file.detail.next.into_vec(),
                prev: file.detail.prev.into_vec(),
            },
            modal: ModalKeys {
                confirm: file.modal.confirm.into_vec(),
                cancel: file.modal.cancel.into_vec(),
            },
            form: FormKeys {
                next: file.form.next.into_vec(),
                prev: file.form.prev.into_vec(),
                edit: file.form.edit.into_vec(),
                save: file.form.save.into_vec(),
                cancel: file.form.cancel.into_vec(),
            },
            editor: EditorKeys {
                confirm: file.editor.confirm.into_vec(),
                cancel: file.editor.cancel.into_vec(),
            },
        }
    }
}

// =============================================================================
// Key binding validation
// =============================================================================

/// Normalize a key binding string to a canonical form for collision detection.
/// Single characters preserve case ('F' means Shift+f).
/// Multi-character key names are case-insensitive.
fn normalize_binding(binding: &str) -> String {
    let trimmed = binding.trim();
    if trimmed.chars().count() == 1 {
        trimmed.to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

/// Check for collisions within a single context
fn check_context_collisions(bindings: &[(&str, &[String])], context_name: &str) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();

    for (action_name, keys) in bindings {
        for key in *keys {
            let normalized = normalize_binding(key);
            if normalized.is_empty() {
                continue;
            }
            if let Some(existing_action) = seen.get(&normalized) {
                bail!(
                    "key binding collision in [keys.{}]: '{}' is bound to both '{}' and '{}'",
                    context_name,
                    key,
                    existing_action,
                    action_name
                );
            }
            seen.insert(normalized, action_name);
        }
    }

    Ok(())
}

/// Validate all key bindings for collisions within each context.
/// Global keys are live on the detail screen, so they are checked together.
fn validate_key_bindings(keys: &Keys) -> Result<()> {
    check_context_collisions(
        &[
            ("quit", &keys.global.quit),
            ("refresh", &keys.global.refresh),
            ("favorite", &keys.detail.favorite),
            ("edit", &keys.detail.edit),
            ("delete", &keys.detail.delete),
            ("open_link", &keys.detail.open_link),
            ("next", &keys.detail.next),
            ("prev", &keys.detail.prev),
        ],
        "detail",
    )?;

    check_context_collisions(
        &[
            ("confirm", &keys.modal.confirm),
            ("cancel", &keys.modal.cancel),
        ],
        "modal",
    )?;

    check_context_collisions(
        &[
            ("next", &keys.form.next),
            ("prev", &keys.form.prev),
            ("edit", &keys.form.edit),
            ("save", &keys.form.save),
            ("cancel", &keys.form.cancel),
        ],
        "form",
    )?;

    check_context_collisions(
        &[
            ("confirm", &keys.editor.confirm),
            ("cancel", &keys.editor.cancel),
        ],
        "editor",
    )?;

    Ok(())
}

// =============================================================================
// UI config
// =============================================================================

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub colors: UiColors,
    pub icons: UiIcons,
    pub image: UiImage,
}

#[derive(Debug, Clone)]
pub struct UiColors {
    pub border: RgbColor,
    pub selection_bg: RgbColor,
    pub selection_fg: RgbColor,
    pub accent: RgbColor,
    pub status_fg: RgbColor,
    pub status_bg: RgbColor,
}

#[derive(Debug, Clone)]
pub struct UiIcons {
    pub favorite: String,
    pub not_favorite: String,
}

#[derive(Debug, Clone)]
pub struct UiImage {
    pub width: u16,
    pub height: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl<'de> serde::Deserialize<'de> for RgbColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Array([u8; 3]),
            Map { r: u8, g: u8, b: u8 },
        }

        let (r, g, b) = match Helper::deserialize(deserializer)? {
            Helper::Array([r, g, b]) => (r, g, b),
            Helper::Map { r, g, b } => (r, g, b),
        };
        Ok(RgbColor { r, g, b })
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct UiFile {
    colors: UiColorsFile,
    icons: UiIconsFile,
    pane: UiPaneFile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct UiColorsFile {
    border: RgbColor,
    selection_bg: RgbColor,
    selection_fg: RgbColor,
    accent: RgbColor,
    status_fg: RgbColor,
    status_bg: RgbColor,
}

impl Default for UiColorsFile {
    fn default() -> Self {
        Self {
            border: RgbColor::new(255, 165, 0),
            selection_bg: RgbColor::new(255, 165, 0),
            selection_fg: RgbColor::new(0, 0, 0),
            accent: RgbColor::new(255, 165, 0),
            status_fg: RgbColor::new(255, 165, 0),
            status_bg: RgbColor::new(0, 0, 0),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct UiIconsFile {
    favorite: String,
    not_favorite: String,
}

impl Default for UiIconsFile {
    fn default() -> Self {
        Self {
            favorite: FAVORITE_GLYPH.to_string(),
            not_favorite: NOT_FAVORITE_GLYPH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct UiPaneFile {
    image: UiImageFile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct UiImageFile {
    width: u16,
    height: u16,
}

impl Default for UiImageFile {
    fn default() -> Self {
        Self {
            width: 24,
            height: 12,
        }
    }
}

impl From<UiFile> for UiConfig {
    fn from(file: UiFile) -> Self {
        let image_defaults = UiImageFile::default();
        let width = if file.pane.image.width == 0 {
            image_defaults.width
        } else {
            file.pane.image.width
        };
        let height = if file.pane.image.height == 0 {
            image_defaults.height
        } else {
            file.pane.image.height
        };
        Self {
            colors: UiColors {
                border: file.colors.border,
                selection_bg: file.colors.selection_bg,
                selection_fg: file.colors.selection_fg,
                accent: file.colors.accent,
                status_fg: file.colors.status_fg,
                status_bg: file.colors.status_bg,
            },
            icons: UiIcons {
                favorite: file.icons.favorite,
                not_favorite: file.icons.not_favorite,
            },
            image: UiImage { width, height },
        }
    }
}

// =============================================================================
// Config file structure
// =============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    db_path: Option<PathBuf>,
    links: LinksFile,
    store: StoreFile,
    keys: KeysFile,
    ui: UiFile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct LinksFile {
    twitter: String,
}

impl Default for LinksFile {
    fn default() -> Self {
        Self {
            twitter: DEFAULT_TWITTER_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StoreFile {
    latency_ms: u64,
}

/// Expand ~ to home directory in paths
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = home::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

fn config_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    Ok(base.config_dir().join(APP_NAME))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE_NAME))
}

/// Directory for the log file and other runtime data.
pub fn data_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine data directories")?;
    Ok(base.data_dir().join(APP_NAME))
}

/// Load configuration. An explicit path must exist; a missing default file
/// means built-in defaults.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => {
            let path = expand_tilde(path);
            if !path.exists() {
                bail!("configuration file not found at {}", path.display());
            }
            path
        }
        None => {
            let path = config_path()?;
            if !path.exists() {
                info!(path = %path.display(), "no configuration file, using defaults");
                return from_file(ConfigFile::default(), None);
            }
            path
        }
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;
    parse(&raw, Some(path))
}

fn parse(raw: &str, path: Option<PathBuf>) -> Result<Config> {
    let display = path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<inline>".to_string());

    let value: toml::Value =
        toml::from_str(raw).with_context(|| format!("failed to parse {} as TOML", display))?;

    warn_unknown_keys(&value);

    let cfg_file: ConfigFile = value
        .try_into()
        .with_context(|| format!("failed to deserialize config from {}", display))?;

    from_file(cfg_file, path)
}

fn from_file(file: ConfigFile, config_path: Option<PathBuf>) -> Result<Config> {
    let db_path = match file.db_path {
        Some(path) => expand_tilde(&path),
        None => db::default_path()?,
    };

    let twitter = file.links.twitter.trim().to_string();
    if twitter.is_empty() {
        bail!("`links.twitter` must not be empty");
    }

    let keys: Keys = file.keys.into();
    validate_key_bindings(&keys)?;

    Ok(Config {
        config_path,
        db_path,
        links: LinksConfig { twitter },
        store: StoreConfig {
            latency: Duration::from_millis(file.store.latency_ms),
        },
        keys,
        ui: file.ui.into(),
    })
}

// =============================================================================
// Unknown key warnings
// =============================================================================

fn warn_unknown_keys(value: &toml::Value) {
    let Some(table) = value.as_table() else {
        return;
    };

    warn_unknown_in(value, "", &["db_path", "links", "store", "keys", "ui"]);

    if let Some(v) = table.get("links") {
        warn_unknown_in(v, "links.", &["twitter"]);
    }
    if let Some(v) = table.get("store") {
        warn_unknown_in(v, "store.", &["latency_ms"]);
    }
    if let Some(keys) = table.get("keys") {
        warn_unknown_in(keys, "keys.", &["global", "detail", "modal", "form", "editor"]);
        if let Some(keys) = keys.as_table() {
            let contexts: [(&str, &[&str]); 5] = [
                ("global", &["quit", "refresh"]),
                (
                    "detail",
                    &["favorite", "edit", "delete", "open_link", "next", "prev"],
                ),
                ("modal", &["confirm", "cancel"]),
                ("form", &["next", "prev", "edit", "save", "cancel"]),
                ("editor", &["confirm", "cancel"]),
            ];
            for (context, known) in contexts {
                if let Some(v) = keys.get(context) {
                    warn_unknown_in(v, &format!("keys.{}.", context), known);
                }
            }
        }
    }
    if let Some(ui) = table.get("ui") {
        warn_unknown_in(ui, "ui.", &["colors", "icons", "pane"]);
        if let Some(ui) = ui.as_table() {
            if let Some(v) = ui.get("colors") {
                warn_unknown_in(
                    v,
                    "ui.colors.",
                    &[
                        "border",
                        "selection_bg",
                        "selection_fg",
                        "accent",
                        "status_fg",
                        "status_bg",
                    ],
                );
            }
            if let Some(v) = ui.get("icons") {
                warn_unknown_in(v, "ui.icons.", &["favorite", "not_favorite"]);
            }
            if let Some(v) = ui.get("pane") {
                warn_unknown_in(v, "ui.pane.", &["image"]);
                if let Some(image) = v.as_table().and_then(|t| t.get("image")) {
                    warn_unknown_in(image, "ui.pane.image.", &["width", "height"]);
                }
            }
        }
    }
}

fn warn_unknown_in(value: &toml::Value, prefix: &str, known: &[&str]) {
    let Some(table) = value.as_table() else {
        return;
    };
    let known_set: HashSet<&str> = known.iter().copied().collect();
    for key in table.keys() {
        if !known_set.contains(key.as_str()) {
            warn!("unknown configuration key `{}{}`", prefix, key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = parse("", None).unwrap();
        assert_eq!(config.links.twitter, "https://twitter.com/{handle}");
        assert_eq!(config.store.latency, Duration::ZERO);
        assert_eq!(config.keys.detail.favorite, vec!["f", "Space"]);
        assert_eq!(config.ui.icons.favorite, "★");
        assert_eq!(config.ui.image.width, 24);
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_parse_sections() {
        let raw = r#"
            db_path = "/tmp/rolodex-test/contacts.db"

            [links]
            twitter = "https://x.com/{handle}"

            [store]
            latency_ms = 250

            [keys.detail]
            favorite = "*"
            delete = ["x", "Delete"]

            [ui.colors]
            accent = [10, 20, 30]
            border = { r = 1, g = 2, b = 3 }

            [ui.pane.image]
            width = 0
        "#;
        let config = parse(raw, None).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/rolodex-test/contacts.db"));
        assert_eq!(config.links.twitter, "https://x.com/{handle}");
        assert_eq!(config.store.latency, Duration::from_millis(250));
        assert_eq!(config.keys.detail.favorite, vec!["*"]);
        assert_eq!(config.keys.detail.delete, vec!["x", "Delete"]);
        assert_eq!(config.keys.detail.edit, vec!["e"]);
        assert_eq!(config.ui.colors.accent, RgbColor::new(10, 20, 30));
        assert_eq!(config.ui.colors.border, RgbColor::new(1, 2, 3));
        assert_eq!(config.ui.image.width, 24);
    }

    #[test]
    fn test_key_collision_rejected() {
        let raw = r#"
            [keys.detail]
            favorite = "e"
        "#;
        let err = parse(raw, None).unwrap_err();
        assert!(err.to_string().contains("key binding collision"));
    }

    #[test]
    fn test_open_link_binding() {
        let config = parse("", None).unwrap();
        assert_eq!(config.keys.detail.open_link, vec!["o"]);

        let raw = r#"
            [keys.detail]
            open_link = ["O", "Enter"]
        "#;
        let config = parse(raw, None).unwrap();
        assert_eq!(config.keys.detail.open_link, vec!["O", "Enter"]);

        let raw = r#"
            [keys.detail]
            open_link = "f"
        "#;
        let err = parse(raw, None).unwrap_err();
        assert!(err.to_string().contains("key binding collision"));
    }

    #[test]
    fn test_global_keys_collide_with_detail_keys() {
        let raw = r#"
            [keys.global]
            quit = "d"
        "#;
        assert!(parse(raw, None).is_err());
    }

    #[test]
    fn test_same_key_allowed_across_contexts() {
        let raw = r#"
            [keys.form]
            save = "y"
        "#;
        assert!(parse(raw, None).is_ok());
    }

    #[test]
    fn test_binding_case_rules() {
        assert_eq!(normalize_binding("ENTER"), "enter");
        assert_eq!(normalize_binding("F"), "F");
        assert_ne!(normalize_binding("f"), normalize_binding("F"));
    }

    #[test]
    fn test_empty_twitter_template_rejected() {
        let raw = r#"
            [links]
            twitter = "  "
        "#;
        assert!(parse(raw, None).is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let db_path = dir.path().join("contacts.db");
        fs::write(&path, format!("db_path = {:?}\n", db_path)).unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.db_path, db_path);
        assert_eq!(config.config_path, Some(path));
    }
}
