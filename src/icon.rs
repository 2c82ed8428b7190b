//! Icon lookup for tasks.
//!
//! Maps an application id to an icon file through the [`IconResolver`]
//! collaborator. The default resolver reads XDG desktop entries and icon
//! theme directories; the taskbar only applies the policy around it (one
//! attempt per app id update, no retries).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use freedesktop_desktop_entry::DesktopEntry;
use once_cell::unsync::OnceCell;

/// Resolves an application id to an icon path
pub trait IconResolver {
    fn resolve_icon_path(&self, app_id: &str, size: u32, scale: f32) -> Option<PathBuf>;
}

/// Resolver used when icons are disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIcons;

impl IconResolver for NoIcons {
    fn resolve_icon_path(&self, _app_id: &str, _size: u32, _scale: f32) -> Option<PathBuf> {
        None
    }
}

/// Icon request parameters
#[derive(Debug, Clone, PartialEq)]
pub struct IconConfig {
    /// Logical icon size in pixels
    pub size: u32,
    /// Output scale factor
    pub scale: f32,
}

impl Default for IconConfig {
    fn default() -> Self {
        Self { size: 22, scale: 1.0 }
    }
}

/// The lookup policy applied when a task learns its app id
pub struct IconLookup {
    resolver: Box<dyn IconResolver>,
    config: IconConfig,
}

impl IconLookup {
    pub fn new(resolver: Box<dyn IconResolver>, config: IconConfig) -> Self {
        Self { resolver, config }
    }

    /// Lookup that never finds anything
    pub fn disabled() -> Self {
        Self::new(Box::new(NoIcons), IconConfig::default())
    }

    pub fn config(&self) -> &IconConfig {
        &self.config
    }

    /// Resolve the icon for an app id. An empty app id is not looked up.
    pub fn resolve(&self, app_id: &str) -> Option<PathBuf> {
        if app_id.is_empty() {
            return None;
        }
        let path = self
            .resolver
            .resolve_icon_path(app_id, self.config.size, self.config.scale);
        match &path {
            Some(p) => log::debug!("Icon for '{}': {:?}", app_id, p),
            None => log::debug!("No icon found for '{}'", app_id),
        }
        path
    }
}

/// Desktop-entry and icon-theme resolver following the XDG base directories.
///
/// Lookup order for an app id:
/// 1. `Icon=` of the desktop entry whose id is the app id (exact, then
///    ignoring ASCII case)
/// 2. the app id itself as an icon name
/// 3. `Icon=` of any desktop entry whose last dotted id segment or
///    `StartupWMClass` matches the app id ignoring ASCII case
///
/// Desktop entries are read once, on the first lookup. Icon names are
/// resolved through the configured theme with `hicolor` and `pixmaps` as
/// fallbacks.
pub struct XdgIconResolver {
    data_dirs: Vec<PathBuf>,
    theme: String,
    index: OnceCell<DesktopIndex>,
}

/// Icon names of the known desktop entries, keyed for the lookup order above
#[derive(Debug, Default)]
struct DesktopIndex {
    exact: HashMap<String, String>,
    folded: HashMap<String, String>,
    loose: HashMap<String, String>,
}

impl DesktopIndex {
    /// Read every `.desktop` file under the application directories.
    /// Earlier directories take precedence.
    fn build(application_dirs: Vec<PathBuf>) -> Self {
        let mut index = DesktopIndex::default();
        let mut entries = 0usize;

        for path in freedesktop_desktop_entry::Iter::new(application_dirs) {
            let Ok(input) = fs::read_to_string(&path) else {
                continue;
            };
            let Ok(entry) = DesktopEntry::decode(&path, &input) else {
                log::debug!("Skipping malformed desktop entry {:?}", path);
                continue;
            };
            let Some(icon) = entry.icon() else {
                continue;
            };
            entries += 1;

            let id = entry.appid;
            index.exact.entry(id.to_string()).or_insert_with(|| icon.to_string());
            index
                .folded
                .entry(id.to_ascii_lowercase())
                .or_insert_with(|| icon.to_string());

            let last_segment = id.rsplit('.').next().unwrap_or(id);
            index
                .loose
                .entry(last_segment.to_ascii_lowercase())
                .or_insert_with(|| icon.to_string());
            if let Some(class) = entry.desktop_entry("StartupWMClass") {
                index
                    .loose
                    .entry(class.to_ascii_lowercase())
                    .or_insert_with(|| icon.to_string());
            }
        }

        log::debug!("Indexed {} desktop entries with icons", entries);
        index
    }

    fn by_id(&self, app_id: &str) -> Option<&str> {
        self.exact
            .get(app_id)
            .or_else(|| self.folded.get(&app_id.to_ascii_lowercase()))
            .map(String::as_str)
    }

    fn by_alias(&self, app_id: &str) -> Option<&str> {
        self.loose.get(&app_id.to_ascii_lowercase()).map(String::as_str)
    }
}

impl XdgIconResolver {
    /// Resolver over `$XDG_DATA_HOME` and `$XDG_DATA_DIRS`
    pub fn new(theme: &str) -> Self {
        let data_dirs = freedesktop_desktop_entry::default_paths()
            .into_iter()
            .filter_map(|apps| apps.parent().map(Path::to_path_buf))
            .collect();
        Self::with_data_dirs(data_dirs, theme)
    }

    /// Resolver over an explicit list of data directories
    pub fn with_data_dirs(data_dirs: Vec<PathBuf>, theme: &str) -> Self {
        Self {
            data_dirs,
            theme: theme.to_string(),
            index: OnceCell::new(),
        }
    }

    fn index(&self) -> &DesktopIndex {
        self.index.get_or_init(|| {
            DesktopIndex::build(self.data_dirs.iter().map(|d| d.join("applications")).collect())
        })
    }

    /// Locate a named icon on disk
    fn lookup_icon(&self, name: &str, size: u32, scale: f32) -> Option<PathBuf> {
        let as_path = Path::new(name);
        if as_path.is_absolute() {
            return as_path.is_file().then(|| as_path.to_path_buf());
        }

        let size = u16::try_from(size).unwrap_or(u16::MAX);
        let scale = scale.max(1.0).round().min(u16::MAX as f32) as u16;
        freedesktop_icons::lookup(name)
            .with_size(size)
            .with_scale(scale)
            .with_theme(&self.theme)
            .with_cache()
            .find()
    }
}

impl IconResolver for XdgIconResolver {
    fn resolve_icon_path(&self, app_id: &str, size: u32, scale: f32) -> Option<PathBuf> {
        let index = self.index();

        if let Some(path) = index.by_id(app_id).and_then(|name| self.lookup_icon(name, size, scale)) {
            return Some(path);
        }

        if let Some(path) = self.lookup_icon(app_id, size, scale) {
            return Some(path);
        }

        index
            .by_alias(app_id)
            .and_then(|name| self.lookup_icon(name, size, scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    /// Data directory with an `applications` folder and one icon file
    fn data_dir() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("applications")).unwrap();
        let icon = dir.path().join("tasklane-test-icon.png");
        fs::write(&icon, b"").unwrap();
        (dir, icon)
    }

    fn write_entry(dir: &TempDir, file: &str, body: &str) {
        let contents = format!("[Desktop Entry]\nType=Application\nName=Test\nExec=true\n{}", body);
        fs::write(dir.path().join("applications").join(file), contents).unwrap();
    }

    fn resolver(dir: &TempDir) -> XdgIconResolver {
        XdgIconResolver::with_data_dirs(vec![dir.path().to_path_buf()], "hicolor")
    }

    #[test]
    fn test_desktop_entry_icon_by_id() {
        let (dir, icon) = data_dir();
        write_entry(&dir, "tasklane-term.desktop", &format!("Icon={}\n", icon.display()));

        let resolver = resolver(&dir);
        assert_eq!(resolver.resolve_icon_path("tasklane-term", 22, 1.0), Some(icon.clone()));
        // case-insensitive id match
        assert_eq!(resolver.resolve_icon_path("Tasklane-Term", 22, 1.0), Some(icon));
    }

    #[test]
    fn test_alias_matches_reverse_dns_id() {
        let (dir, icon) = data_dir();
        write_entry(
            &dir,
            "org.example.tasklane-browser.desktop",
            &format!("Icon={}\n", icon.display()),
        );

        let resolver = resolver(&dir);
        assert_eq!(resolver.resolve_icon_path("tasklane-browser", 22, 1.0), Some(icon));
    }

    #[test]
    fn test_alias_matches_startup_wm_class() {
        let (dir, icon) = data_dir();
        write_entry(
            &dir,
            "tasklane-editor.desktop",
            &format!("Icon={}\nStartupWMClass=TasklaneEditorWindow\n", icon.display()),
        );

        let resolver = resolver(&dir);
        assert_eq!(resolver.resolve_icon_path("tasklaneeditorwindow", 22, 1.0), Some(icon));
    }

    #[test]
    fn test_missing_icon_is_none() {
        let (dir, _icon) = data_dir();
        write_entry(&dir, "tasklane-broken.desktop", "Icon=/nonexistent/tasklane.png\n");

        let resolver = resolver(&dir);
        assert_eq!(resolver.resolve_icon_path("tasklane-broken", 22, 1.0), None);
        assert_eq!(resolver.resolve_icon_path("tasklane-nothing-here", 22, 1.0), None);
    }

    #[test]
    fn test_entries_are_read_once() {
        let (dir, icon) = data_dir();
        write_entry(&dir, "tasklane-once.desktop", &format!("Icon={}\n", icon.display()));

        let resolver = resolver(&dir);
        assert_eq!(resolver.resolve_icon_path("tasklane-once", 22, 1.0), Some(icon.clone()));

        // later lookups use the index, not the files
        fs::remove_file(dir.path().join("applications/tasklane-once.desktop")).unwrap();
        write_entry(&dir, "tasklane-late.desktop", &format!("Icon={}\n", icon.display()));
        assert_eq!(resolver.resolve_icon_path("tasklane-once", 22, 1.0), Some(icon));
        assert_eq!(resolver.resolve_icon_path("tasklane-late", 22, 1.0), None);
    }

    struct Recording(Rc<RefCell<Vec<String>>>);

    impl IconResolver for Recording {
        fn resolve_icon_path(&self, app_id: &str, _size: u32, _scale: f32) -> Option<PathBuf> {
            self.0.borrow_mut().push(app_id.to_string());
            None
        }
    }

    #[test]
    fn test_lookup_skips_empty_app_id() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let lookup = IconLookup::new(Box::new(Recording(calls.clone())), IconConfig::default());
        assert_eq!(lookup.resolve(""), None);
        assert_eq!(lookup.resolve("foot"), None);
        assert_eq!(*calls.borrow(), vec!["foot".to_string()]);
    }
}
