//! Named settings profiles persisted with file locking.
//!
//! The store is a single JSON document. Reads take a shared lock and
//! treat an unreadable file as empty; writes go through a locked temp
//! file that is renamed over the original.

use crate::settings::{resolve_active, ClinicalSettings, SettingsProvider};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Name given to the profile seeded on first use
pub const DEFAULT_PROFILE_NAME: &str = "Default";

/// A named set of clinical thresholds.
///
/// Settings are kept in stored form and decoded on read so that older or
/// partial profiles still resolve.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SettingsProfile {
    pub id: u64,
    pub name: String,
    pub is_active: bool,
    #[serde(default)]
    pub settings: serde_json::Value,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct ProfileFile {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    profiles: Vec<SettingsProfile>,
}

enum Stored {
    Missing,
    Parsed(ProfileFile),
    Corrupt(String),
}

/// File-backed profile store
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored profiles, in creation order
    pub fn list(&self) -> Result<Vec<SettingsProfile>> {
        Ok(self.load()?.profiles)
    }

    /// The active profile, or the first one if none is flagged
    pub fn active(&self) -> Result<Option<SettingsProfile>> {
        let file = self.load()?;
        Ok(file
            .profiles
            .iter()
            .find(|p| p.is_active)
            .or_else(|| file.profiles.first())
            .cloned())
    }

    /// Seed a single active default profile if the store is empty. A
    /// corrupt store is moved to [`corrupt_path`](Self::corrupt_path) first.
    pub fn ensure_default(&self) -> Result<()> {
        if !self.load()?.profiles.is_empty() {
            return Ok(());
        }
        self.update(|file| {
            if file.profiles.is_empty() {
                tracing::info!("Seeding '{}' settings profile", DEFAULT_PROFILE_NAME);
                push_profile(file, DEFAULT_PROFILE_NAME, ClinicalSettings::defaults(), true)?;
            }
            Ok(())
        })
        .map(|_| ())
    }

    /// Create a new profile and make it the only active one
    pub fn create(&self, name: &str, settings: &ClinicalSettings) -> Result<SettingsProfile> {
        let name = checked_name(name)?;
        let file = self.update(|file| {
            if file.profiles.iter().any(|p| p.name == name) {
                return Err(Error::Profile(format!(
                    "A profile named \"{}\" already exists.",
                    name
                )));
            }
            for p in file.profiles.iter_mut() {
                p.is_active = false;
            }
            push_profile(file, name, settings, true)
        })?;

        tracing::info!("Created settings profile '{}'", name);
        last_profile(file)
    }

    /// Rename and/or replace the settings of the active profile
    pub fn update_active(&self, name: &str, settings: &ClinicalSettings) -> Result<SettingsProfile> {
        let name = checked_name(name)?;
        let stored = settings.to_stored()?;
        let file = self.update(|file| {
            let idx = active_index(file)
                .ok_or_else(|| Error::Profile("No active profile found to update.".into()))?;
            let clash = file
                .profiles
                .iter()
                .enumerate()
                .any(|(i, p)| i != idx && p.name == name);
            if clash {
                return Err(Error::Profile(format!(
                    "A profile named \"{}\" already exists.",
                    name
                )));
            }
            let profile = &mut file.profiles[idx];
            profile.name = name.to_string();
            profile.settings = stored;
            profile.last_modified = Some(Utc::now());
            Ok(())
        })?;

        active_profile(&file)
    }

    /// Make `id` the only active profile
    pub fn activate(&self, id: u64) -> Result<SettingsProfile> {
        let file = self.update(|file| {
            if !file.profiles.iter().any(|p| p.id == id) {
                return Err(Error::Profile(format!("Profile with ID {} not found.", id)));
            }
            for p in file.profiles.iter_mut() {
                p.is_active = p.id == id;
            }
            Ok(())
        })?;

        tracing::info!("Activated settings profile {}", id);
        active_profile(&file)
    }

    /// Delete a profile. The last remaining profile cannot be deleted; if
    /// the active one goes, the first remaining profile becomes active.
    pub fn delete(&self, id: u64) -> Result<SettingsProfile> {
        let mut removed = None;
        self.update(|file| {
            let idx = file
                .profiles
                .iter()
                .position(|p| p.id == id)
                .ok_or_else(|| Error::Profile(format!("Profile with ID {} not found.", id)))?;
            if file.profiles.len() <= 1 {
                return Err(Error::Profile(
                    "Cannot delete the only profile. Create another profile first.".into(),
                ));
            }
            let profile = file.profiles.remove(idx);
            if profile.is_active {
                if let Some(first) = file.profiles.first_mut() {
                    first.is_active = true;
                }
            }
            removed = Some(profile);
            Ok(())
        })?;

        removed.ok_or_else(|| Error::Profile(format!("Profile with ID {} not found.", id)))
    }

    /// Replace the active profile's settings with the defaults
    pub fn reset_defaults(&self) -> Result<SettingsProfile> {
        self.ensure_default()?;
        let active = self
            .active()?
            .ok_or_else(|| Error::Profile("No active profile found to reset.".into()))?;
        self.update_active(&active.name, ClinicalSettings::defaults())
    }

    /// Read-only view. A missing, unreadable or corrupt store reads as empty.
    fn load(&self) -> Result<ProfileFile> {
        match self.read_stored() {
            Ok(Stored::Parsed(file)) => Ok(file),
            Ok(Stored::Missing) => Ok(ProfileFile::default()),
            Ok(Stored::Corrupt(e)) => {
                tracing::warn!("Failed to parse profile store {:?}: {}. Treating as empty.", self.path, e);
                Ok(ProfileFile::default())
            }
            Err(e) => {
                tracing::warn!("Unable to read profile store {:?}: {}. Treating as empty.", self.path, e);
                Ok(ProfileFile::default())
            }
        }
    }

    /// Load for a write. A corrupt store is moved aside first so the
    /// rewrite never destroys it; an unreadable one is an error.
    fn load_for_update(&self) -> Result<ProfileFile> {
        match self.read_stored()? {
            Stored::Parsed(file) => Ok(file),
            Stored::Missing => Ok(ProfileFile::default()),
            Stored::Corrupt(e) => {
                let aside = self.corrupt_path();
                tracing::warn!(
                    "Profile store {:?} is corrupt ({}). Moving it to {:?} and starting empty.",
                    self.path,
                    e,
                    aside
                );
                std::fs::rename(&self.path, &aside)?;
                Ok(ProfileFile::default())
            }
        }
    }

    fn read_stored(&self) -> Result<Stored> {
        if !self.path.exists() {
            return Ok(Stored::Missing);
        }

        let file = File::open(&self.path)?;
        file.lock_shared()?;
        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        match serde_json::from_str::<ProfileFile>(&contents) {
            Ok(parsed) => {
                tracing::debug!("Loaded {} profiles from {:?}", parsed.profiles.len(), self.path);
                Ok(Stored::Parsed(parsed))
            }
            Err(e) => Ok(Stored::Corrupt(e.to_string())),
        }
    }

    /// Where a corrupt store is kept, e.g. `profiles.json.corrupt`
    pub fn corrupt_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".corrupt");
        self.path.with_file_name(name)
    }

    fn save(&self, contents: &ProfileFile) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            Error::Persistence(format!("profile store path {:?} has no parent", self.path))
        })?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let json = serde_json::to_string_pretty(contents)?;
            writer.write_all(json.as_bytes())?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        tracing::debug!("Saved profile store to {:?}", self.path);
        Ok(())
    }

    /// Load, modify and save back. Nothing is written if `f` fails.
    fn update<F>(&self, f: F) -> Result<ProfileFile>
    where
        F: FnOnce(&mut ProfileFile) -> Result<()>,
    {
        let mut file = self.load_for_update()?;
        f(&mut file)?;
        self.save(&file)?;
        Ok(file)
    }
}

impl SettingsProvider for ProfileStore {
    fn active_settings(&self) -> ClinicalSettings {
        match self.list() {
            Ok(profiles) => resolve_active(&profiles),
            Err(e) => {
                tracing::warn!("Unable to read settings profiles: {}. Using defaults.", e);
                ClinicalSettings::defaults().clone()
            }
        }
    }
}

fn checked_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Profile("Profile name must not be empty.".into()));
    }
    Ok(trimmed)
}

fn push_profile(
    file: &mut ProfileFile,
    name: &str,
    settings: &ClinicalSettings,
    is_active: bool,
) -> Result<()> {
    let max_existing = file.profiles.iter().map(|p| p.id).max().unwrap_or(0);
    let id = file.next_id.max(max_existing) + 1;
    file.next_id = id;
    file.profiles.push(SettingsProfile {
        id,
        name: name.to_string(),
        is_active,
        settings: settings.to_stored()?,
        created_at: Utc::now(),
        last_modified: None,
    });
    Ok(())
}

fn active_index(file: &ProfileFile) -> Option<usize> {
    file.profiles
        .iter()
        .position(|p| p.is_active)
        .or(if file.profiles.is_empty() { None } else { Some(0) })
}

fn active_profile(file: &ProfileFile) -> Result<SettingsProfile> {
    active_index(file)
        .map(|i| file.profiles[i].clone())
        .ok_or_else(|| Error::Profile("No active profile.".into()))
}

fn last_profile(file: ProfileFile) -> Result<SettingsProfile> {
    file.profiles
        .into_iter()
        .last()
        .ok_or_else(|| Error::Profile("Profile store is empty.".into()))
}
