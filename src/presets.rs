use crate::error::{IniError, Result};
use crate::session::EditSession;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;

/// A preset parameter value as stored in the template.
///
/// Untagged so user JSON can use native scalars; rendered to INI string
/// form when applied to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PresetValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl PresetValue {
    pub fn to_ini_string(&self) -> String {
        match self {
            PresetValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            PresetValue::Int(i) => i.to_string(),
            PresetValue::Str(s) => s.clone(),
        }
    }
}

/// A named, immutable template of parameter overrides.
///
/// Applying a preset never deletes keys absent from the template; it only
/// overwrites keys present in both the template and the target session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub description_en: String,
    #[serde(default)]
    pub description_ru: String,
    #[serde(default = "default_author")]
    pub author: String,
    pub parameters: IndexMap<String, PresetValue>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub created_date: String,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_author() -> String {
    "User".to_string()
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_category() -> String {
    "User".to_string()
}

impl Preset {
    /// Apply this preset onto a session's working copy.
    ///
    /// Every template key is matched case-insensitively against the
    /// session's loaded parameters; matches are routed through
    /// [`EditSession::update_parameter`], so the modified set stays
    /// correct and the values flow through the normal commit path.
    /// Template keys the session does not have are silently skipped.
    ///
    /// Returns the number of parameters actually updated.
    pub fn apply_to(&self, session: &mut EditSession) -> usize {
        let updates: Vec<(String, String, String)> = self
            .parameters
            .iter()
            .filter_map(|(preset_key, value)| {
                session
                    .parameters()
                    .iter()
                    .find(|p| p.key.eq_ignore_ascii_case(preset_key))
                    .map(|p| (p.section.clone(), p.key.clone(), value.to_ini_string()))
            })
            .collect();

        let applied = updates.len();
        for (section, key, value) in updates {
            session.update_parameter(&section, &key, &value);
        }

        tracing::info!(
            "Applied preset '{}': {} of {} parameters matched",
            self.name,
            applied,
            self.parameters.len()
        );
        applied
    }
}

/// Preset pools: a fixed built-in catalog plus a user catalog loaded from
/// a directory of JSON files.
///
/// Lookup and listing always merge both, with user presets shadowing a
/// built-in preset of the same identifier. The built-in pool is never
/// mutated.
#[derive(Debug, Clone)]
pub struct PresetManager {
    presets_dir: Utf8PathBuf,
    built_in: IndexMap<String, Preset>,
    user: IndexMap<String, Preset>,
}

impl PresetManager {
    pub fn new<P: AsRef<Utf8Path>>(presets_dir: P) -> Self {
        let presets_dir = presets_dir.as_ref().to_path_buf();
        let user = load_user_presets(&presets_dir);
        Self {
            presets_dir,
            built_in: built_in_presets(),
            user,
        }
    }

    /// All presets merged, built-ins first, user entries shadowing
    /// built-ins of the same id.
    pub fn all_presets(&self) -> IndexMap<String, Preset> {
        let mut merged = self.built_in.clone();
        for (id, preset) in &self.user {
            merged.insert(id.clone(), preset.clone());
        }
        merged
    }

    pub fn get(&self, id: &str) -> Option<Preset> {
        self.user.get(id).or_else(|| self.built_in.get(id)).cloned()
    }

    pub fn by_category(&self, category: &str) -> IndexMap<String, Preset> {
        self.all_presets()
            .into_iter()
            .filter(|(_, p)| p.category == category)
            .collect()
    }

    pub fn by_tags(&self, tags: &[&str]) -> IndexMap<String, Preset> {
        self.all_presets()
            .into_iter()
            .filter(|(_, p)| tags.iter().any(|t| p.tags.iter().any(|pt| pt == t)))
            .collect()
    }

    /// Sorted list of every category in use.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .all_presets()
            .values()
            .map(|p| p.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }

    /// Persist a user preset as `<slug>.json` in the presets directory.
    ///
    /// Returns the slug it was stored under.
    pub fn save_user_preset(&mut self, preset: &Preset) -> Result<String> {
        if !self.presets_dir.exists() {
            fs::create_dir_all(&self.presets_dir)?;
        }

        let slug = preset_slug(&preset.name);
        if slug.is_empty() {
            return Err(IniError::PresetStore(format!(
                "preset name '{}' yields an empty file name",
                preset.name
            )));
        }

        let json = serde_json::to_string_pretty(preset)
            .map_err(|e| IniError::PresetStore(e.to_string()))?;
        fs::write(self.presets_dir.join(format!("{slug}.json")), json)?;

        self.user = load_user_presets(&self.presets_dir);
        tracing::info!("Saved user preset '{}' as {}.json", preset.name, slug);
        Ok(slug)
    }

    /// Delete a user preset by name. Returns false if it did not exist.
    ///
    /// Built-in presets cannot be deleted.
    pub fn delete_user_preset(&mut self, name: &str) -> bool {
        let slug = preset_slug(name);
        let path = self.presets_dir.join(format!("{slug}.json"));

        if !path.exists() {
            return false;
        }
        if let Err(e) = fs::remove_file(&path) {
            tracing::warn!("Failed to delete preset {}: {}", path, e);
            return false;
        }

        self.user = load_user_presets(&self.presets_dir);
        true
    }
}

/// Filesystem-safe slug for a preset name: alphanumerics, spaces, dashes
/// and underscores kept, spaces collapsed to underscores, lowercased.
fn preset_slug(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim_end()
        .replace(' ', "_")
        .to_lowercase()
}

/// Load user presets from `<dir>/*.json`, skipping unreadable files.
fn load_user_presets(presets_dir: &Utf8Path) -> IndexMap<String, Preset> {
    let mut presets = IndexMap::new();

    if !presets_dir.exists() {
        return presets;
    }

    let entries = match fs::read_dir(presets_dir.as_std_path()) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot read presets directory {}: {}", presets_dir, e);
            return presets;
        }
    };

    let mut paths: Vec<Utf8PathBuf> = entries
        .flatten()
        .filter_map(|e| Utf8PathBuf::try_from(e.path()).ok())
        .filter(|p| p.extension() == Some("json"))
        .collect();
    paths.sort();

    for path in paths {
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!("Failed to read preset {}: {}", path, e);
                continue;
            }
        };
        match serde_json::from_str::<Preset>(&contents) {
            Ok(preset) => {
                let id = path.file_stem().unwrap_or_default().to_string();
                presets.insert(id, preset);
            }
            Err(e) => tracing::warn!("Failed to parse preset {}: {}", path, e),
        }
    }

    presets
}

/// The fixed built-in preset catalog.
fn built_in_presets() -> IndexMap<String, Preset> {
    let mut presets = IndexMap::new();

    presets.insert(
        "high_performance".to_string(),
        Preset {
            name: "High Performance".to_string(),
            description_en: "Optimized for maximum rendering performance and speed".to_string(),
            description_ru: "Оптимизировано для максимальной производительности рендеринга"
                .to_string(),
            author: "MaxManager".to_string(),
            parameters: preset_params(&[
                ("RenderThreads", PresetValue::Int(16)),
                ("UseAllCores", PresetValue::Bool(true)),
                ("ThreadPriority", PresetValue::Int(3)),
                ("MemoryPool", PresetValue::Int(2048)),
                ("DynamicHeapSize", PresetValue::Bool(true)),
                ("PageFileSize", PresetValue::Int(8192)),
                ("ViewportPerformanceMode", PresetValue::Int(1)),
                ("AutoBackup", PresetValue::Bool(true)),
                ("BackupInterval", PresetValue::Int(5)),
            ]),
            tags: string_vec(&["performance", "rendering", "speed", "optimization"]),
            version: "1.0".to_string(),
            created_date: "2025-10-17".to_string(),
            category: "Performance".to_string(),
        },
    );

    presets.insert(
        "memory_optimized".to_string(),
        Preset {
            name: "Memory Optimized".to_string(),
            description_en: "Optimized for large scenes with high memory usage".to_string(),
            description_ru: "Оптимизировано для больших сцен с высоким потреблением памяти"
                .to_string(),
            author: "MaxManager".to_string(),
            parameters: preset_params(&[
                ("RenderThreads", PresetValue::Int(8)),
                ("UseAllCores", PresetValue::Bool(true)),
                ("ThreadPriority", PresetValue::Int(2)),
                ("MemoryPool", PresetValue::Int(4096)),
                ("DynamicHeapSize", PresetValue::Bool(true)),
                ("PageFileSize", PresetValue::Int(16384)),
                ("ViewportPerformanceMode", PresetValue::Int(0)),
                ("AutoBackup", PresetValue::Bool(true)),
                ("BackupInterval", PresetValue::Int(15)),
            ]),
            tags: string_vec(&["memory", "large_scenes", "optimization"]),
            version: "1.0".to_string(),
            created_date: "2025-10-17".to_string(),
            category: "Memory".to_string(),
        },
    );

    presets.insert(
        "arnold_renderer".to_string(),
        Preset {
            name: "Arnold Renderer".to_string(),
            description_en: "Optimized settings for Arnold rendering workflow".to_string(),
            description_ru: "Оптимизированные настройки для рабочего процесса Arnold".to_string(),
            author: "MaxManager".to_string(),
            parameters: preset_params(&[
                ("RenderThreads", PresetValue::Int(12)),
                ("UseAllCores", PresetValue::Bool(true)),
                ("ThreadPriority", PresetValue::Int(2)),
                ("MemoryPool", PresetValue::Int(3072)),
                ("DynamicHeapSize", PresetValue::Bool(true)),
                ("PageFileSize", PresetValue::Int(12288)),
                ("ViewportPerformanceMode", PresetValue::Int(2)),
                ("AutoBackup", PresetValue::Bool(true)),
                ("BackupInterval", PresetValue::Int(10)),
            ]),
            tags: string_vec(&["arnold", "renderer", "workflow"]),
            version: "1.0".to_string(),
            created_date: "2025-10-17".to_string(),
            category: "Renderers".to_string(),
        },
    );

    presets.insert(
        "vray_renderer".to_string(),
        Preset {
            name: "V-Ray Renderer".to_string(),
            description_en: "Optimized settings for V-Ray rendering workflow".to_string(),
            description_ru: "Оптимизированные настройки для рабочего процесса V-Ray".to_string(),
            author: "MaxManager".to_string(),
            parameters: preset_params(&[
                ("RenderThreads", PresetValue::Int(14)),
                ("UseAllCores", PresetValue::Bool(true)),
                ("ThreadPriority", PresetValue::Int(2)),
                ("MemoryPool", PresetValue::Int(2560)),
                ("DynamicHeapSize", PresetValue::Bool(true)),
                ("PageFileSize", PresetValue::Int(10240)),
                ("ViewportPerformanceMode", PresetValue::Int(1)),
                ("AutoBackup", PresetValue::Bool(true)),
                ("BackupInterval", PresetValue::Int(10)),
            ]),
            tags: string_vec(&["vray", "renderer", "workflow"]),
            version: "1.0".to_string(),
            created_date: "2025-10-17".to_string(),
            category: "Renderers".to_string(),
        },
    );

    presets.insert(
        "minimal".to_string(),
        Preset {
            name: "Minimal".to_string(),
            description_en: "Minimal settings for basic 3ds Max functionality".to_string(),
            description_ru: "Минимальные настройки для базовой функциональности 3ds Max"
                .to_string(),
            author: "MaxManager".to_string(),
            parameters: preset_params(&[
                ("RenderThreads", PresetValue::Int(4)),
                ("UseAllCores", PresetValue::Bool(false)),
                ("ThreadPriority", PresetValue::Int(1)),
                ("MemoryPool", PresetValue::Int(512)),
                ("DynamicHeapSize", PresetValue::Bool(false)),
                ("PageFileSize", PresetValue::Int(2048)),
                ("ViewportPerformanceMode", PresetValue::Int(0)),
                ("AutoBackup", PresetValue::Bool(false)),
                ("BackupInterval", PresetValue::Int(30)),
            ]),
            tags: string_vec(&["minimal", "basic", "lightweight"]),
            version: "1.0".to_string(),
            created_date: "2025-10-17".to_string(),
            category: "General".to_string(),
        },
    );

    presets
}

fn preset_params(entries: &[(&str, PresetValue)]) -> IndexMap<String, PresetValue> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn string_vec(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(dir: &TempDir) -> PresetManager {
        PresetManager::new(Utf8PathBuf::try_from(dir.path().join("presets")).unwrap())
    }

    #[test]
    fn test_built_in_presets_present() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);

        let all = manager.all_presets();
        assert_eq!(all.len(), 5);
        assert!(all.contains_key("high_performance"));
        assert!(all.contains_key("minimal"));

        let preset = manager.get("high_performance").unwrap();
        assert_eq!(preset.parameters["RenderThreads"], PresetValue::Int(16));
    }

    #[test]
    fn test_slug() {
        assert_eq!(preset_slug("High Performance"), "high_performance");
        assert_eq!(preset_slug("V-Ray Renderer"), "v-ray_renderer");
        assert_eq!(preset_slug("My/Weird\\Name!"), "myweirdname");
    }

    #[test]
    fn test_save_and_delete_user_preset() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);

        let preset = Preset {
            name: "My Setup".to_string(),
            description_en: String::new(),
            description_ru: String::new(),
            author: "User".to_string(),
            parameters: preset_params(&[("RenderThreads", PresetValue::Int(6))]),
            tags: vec![],
            version: "1.0".to_string(),
            created_date: String::new(),
            category: "User".to_string(),
        };

        let slug = manager.save_user_preset(&preset).unwrap();
        assert_eq!(slug, "my_setup");
        assert_eq!(manager.get("my_setup").unwrap().name, "My Setup");

        assert!(manager.delete_user_preset("My Setup"));
        assert!(manager.get("my_setup").is_none());
        assert!(!manager.delete_user_preset("My Setup"));
    }

    #[test]
    fn test_user_preset_shadows_built_in() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);

        let mut custom = manager.get("minimal").unwrap();
        custom
            .parameters
            .insert("RenderThreads".to_string(), PresetValue::Int(2));
        manager.save_user_preset(&custom).unwrap();

        let resolved = manager.get("minimal").unwrap();
        assert_eq!(resolved.parameters["RenderThreads"], PresetValue::Int(2));
        // Built-in pool count is unchanged; the merge shadows, not replaces.
        assert_eq!(manager.all_presets().len(), 5);
    }

    #[test]
    fn test_unreadable_user_preset_is_skipped() {
        let dir = TempDir::new().unwrap();
        let presets_dir = dir.path().join("presets");
        std::fs::create_dir_all(&presets_dir).unwrap();
        std::fs::write(presets_dir.join("broken.json"), "{not json").unwrap();

        let manager = PresetManager::new(Utf8PathBuf::try_from(presets_dir).unwrap());
        assert_eq!(manager.all_presets().len(), 5);
    }

    #[test]
    fn test_by_category_and_tags() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);

        assert_eq!(manager.by_category("Renderers").len(), 2);
        assert_eq!(manager.by_tags(&["memory"]).len(), 1);
        assert!(manager.categories().contains(&"Performance".to_string()));
    }

    #[test]
    fn test_preset_value_to_ini_string() {
        assert_eq!(PresetValue::Bool(true).to_ini_string(), "1");
        assert_eq!(PresetValue::Int(16).to_ini_string(), "16");
        assert_eq!(PresetValue::Str("x".to_string()).to_ini_string(), "x");
    }
}
