use anyhow::{Result, Context};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

/// Name of the audio directory under the output root
pub const AUDIO_DIR_NAME: &str = "audio";

/// Stem of the book-level outputs
pub const AUDIOBOOK_STEM: &str = "audiobook";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Remove a directory tree; a missing directory is not an error
    pub fn remove_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            fs::remove_dir_all(path)
                .with_context(|| format!("Failed to remove directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Remove a file; a missing file is not an error
    pub fn remove_file<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove file: {:?}", path))?;
        }
        Ok(())
    }

    /// Chapter text files directly inside `dir`, in lexicographic file-name order
    pub fn find_chapter_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        if !Self::dir_exists(dir) {
            return Err(anyhow::anyhow!("Chapters directory does not exist: {:?}", dir));
        }

        let mut chapters = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            let is_txt = path
                .extension()
                .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("txt"));
            if path.is_file() && is_txt {
                chapters.push(path.to_path_buf());
            }
        }

        Ok(chapters)
    }

    /// Chapter name of a text file (its stem)
    pub fn chapter_name<P: AsRef<Path>>(path: P) -> String {
        path.as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Where every artifact of one book lives under the output root
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root.join(AUDIO_DIR_NAME)
    }

    pub fn introduction_audio(&self) -> PathBuf {
        self.audio_dir().join("introduction.wav")
    }

    pub fn introduction_manifest(&self) -> PathBuf {
        self.audio_dir().join("introduction.json")
    }

    pub fn introduction_captions(&self) -> PathBuf {
        self.audio_dir().join("introduction.srt")
    }

    /// Per-chapter work dir holding chunk WAVs and the manifest
    pub fn chapter_work_dir(&self, chapter: &str) -> PathBuf {
        self.audio_dir().join(chapter)
    }

    pub fn chapter_audio(&self, chapter: &str) -> PathBuf {
        self.audio_dir().join(format!("{}.wav", chapter))
    }

    pub fn chapter_captions(&self, chapter: &str) -> PathBuf {
        self.audio_dir().join(format!("{}.srt", chapter))
    }

    pub fn book_audio(&self) -> PathBuf {
        self.root.join(format!("{}.wav", AUDIOBOOK_STEM))
    }

    pub fn book_captions(&self) -> PathBuf {
        self.root.join(format!("{}.srt", AUDIOBOOK_STEM))
    }

    /// True when both chapter outputs are already on disk
    pub fn chapter_outputs_exist(&self, chapter: &str) -> bool {
        FileManager::file_exists(self.chapter_audio(chapter))
            && FileManager::file_exists(self.chapter_captions(chapter))
    }
}
