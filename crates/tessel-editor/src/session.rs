//! The editing session state machine.
//!
//! `Clean -> Dirty` on any accepted operation (including undo and redo),
//! `Dirty -> Clean` on a successful save. A failed save leaves the session
//! dirty.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use tessel_codegen::Generator;
use tessel_model::asset::{AssetResolver, NoAssets};
use tessel_model::document::{ChangeEvent, Document, ListenerId};
use tessel_model::engine::OperationEngine;
use tessel_model::history::History;
use tessel_model::operation::Operation;
use tessel_model::settings::SceneSettings;
use tessel_scene::{from_json, to_json, LoadIssue, LoadStatus};

use crate::config::EditorConfig;
use crate::worker::{GenerationTicket, GenerationWorker};
use crate::SessionError;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What happened to the generated source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub path: PathBuf,
    /// `false` when the file already held exactly this output.
    pub written: bool,
}

/// Result of a successful scene save.
#[derive(Debug)]
pub struct SaveReport {
    pub scene: PathBuf,
    /// Asset references the resolver could not answer while saving.
    pub issues: Vec<LoadIssue>,
    /// `None` when the scene has `generateOnSave` turned off.
    pub generation: Option<Result<GenerationOutcome, SessionError>>,
}

impl SaveReport {
    pub fn generation_failed(&self) -> bool {
        matches!(self.generation, Some(Err(_)))
    }
}

// ---------------------------------------------------------------------------
// EditorSession
// ---------------------------------------------------------------------------

pub struct EditorSession {
    path: PathBuf,
    engine: OperationEngine,
    resolver: Box<dyn AssetResolver>,
    config: EditorConfig,
    load_status: LoadStatus,
}

impl EditorSession {
    /// Load the scene at `path`.
    ///
    /// Unresolved assets do not fail the open; see [`Self::load_status`].
    pub fn open(
        path: impl Into<PathBuf>,
        resolver: impl AssetResolver + 'static,
        config: EditorConfig,
    ) -> Result<Self, SessionError> {
        let path = path.into();
        let text = fs::read_to_string(&path).map_err(|e| SessionError::io(&path, e))?;
        let outcome = from_json(&text, &resolver)?;
        if !outcome.status.is_clean() {
            warn!(scene = %path.display(), issues = outcome.status.issues.len(), "scene opened with issues");
        }
        info!(scene = %path.display(), entities = outcome.document.len(), "scene opened");

        Ok(Self {
            engine: OperationEngine::with_config(outcome.document, config.engine.clone()),
            path,
            resolver: Box::new(resolver),
            config,
            load_status: outcome.status,
        })
    }

    /// Start a new scene at `path` and save it right away.
    ///
    /// Fails with an `AlreadyExists` I/O error rather than overwrite a file.
    pub fn create(
        path: impl Into<PathBuf>,
        settings: SceneSettings,
        config: EditorConfig,
    ) -> Result<(Self, SaveReport), SessionError> {
        let path = path.into();
        if path.exists() {
            return Err(SessionError::io(
                &path,
                io::Error::new(io::ErrorKind::AlreadyExists, "scene file already exists"),
            ));
        }

        let mut session = Self {
            engine: OperationEngine::with_config(Document::with_settings(settings), config.engine.clone()),
            path,
            resolver: Box::new(NoAssets),
            config,
            load_status: LoadStatus::default(),
        };
        let report = session.save()?;
        info!(scene = %session.path.display(), "scene created");
        Ok((session, report))
    }

    // -- queries ----------------------------------------------------------

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &Document {
        self.engine.document()
    }

    pub fn history(&self) -> &History {
        self.engine.history()
    }

    pub fn is_dirty(&self) -> bool {
        self.engine.is_dirty()
    }

    pub fn can_undo(&self) -> bool {
        self.engine.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.engine.can_redo()
    }

    /// Problems found when the scene was opened.
    pub fn load_status(&self) -> &LoadStatus {
        &self.load_status
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Use a different resolver for subsequent saves.
    pub fn set_resolver(&mut self, resolver: impl AssetResolver + 'static) {
        self.resolver = Box::new(resolver);
    }

    // -- editing ----------------------------------------------------------

    pub fn apply(&mut self, op: Operation) -> Result<(), SessionError> {
        Ok(self.engine.apply(op)?)
    }

    pub fn undo(&mut self) -> Result<(), SessionError> {
        Ok(self.engine.undo()?)
    }

    pub fn redo(&mut self) -> Result<(), SessionError> {
        Ok(self.engine.redo()?)
    }

    /// The document as it would look after `op`, without recording anything.
    pub fn preview(&self, op: &Operation) -> Result<Document, SessionError> {
        Ok(self.engine.preview(op)?)
    }

    pub fn on_change(&mut self, listener: impl FnMut(&ChangeEvent) + 'static) -> ListenerId {
        self.engine.on_change(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.engine.remove_listener(id)
    }

    // -- persistence ------------------------------------------------------

    /// Write the scene file, then regenerate code if the scene asks for it.
    ///
    /// A generation failure is reported in [`SaveReport::generation`]; the
    /// scene file stays saved and the session clean.
    pub fn save(&mut self) -> Result<SaveReport, SessionError> {
        let output = to_json(self.engine.document(), self.resolver.as_ref())?;
        write_atomic(&self.path, output.file.as_bytes())?;
        self.engine.replace_assets(output.assets);
        self.engine.mark_clean();
        info!(scene = %self.path.display(), bytes = output.file.len(), "scene saved");

        let generation = self
            .engine
            .document()
            .settings()
            .generate_on_save
            .then(|| self.generate_now());
        if let Some(Err(e)) = &generation {
            warn!(scene = %self.path.display(), error = %e, "code generation failed after save");
        }

        Ok(SaveReport {
            scene: self.path.clone(),
            issues: output.issues,
            generation,
        })
    }

    /// Where generated code for this scene goes: `<stem>.<js|ts>` next to
    /// the scene, or in the configured output directory.
    pub fn output_path(&self) -> PathBuf {
        let ext = self.engine.document().settings().output_language.extension();
        let file_name = format!("{}.{ext}", self.stem());
        match &self.config.output_dir {
            Some(dir) => dir.join(file_name),
            None => self.path.with_file_name(file_name),
        }
    }

    /// A generator configured for this scene.
    pub fn generator(&self) -> Generator {
        Generator::new(self.config.codegen.clone()).with_fallback_class(self.stem())
    }

    /// Generate into [`Self::output_path`] on the calling thread.
    pub fn generate_now(&self) -> Result<GenerationOutcome, SessionError> {
        self.generate_to(&self.output_path())
    }

    /// Generate into an explicit file, merging with its current content.
    pub fn generate_to(&self, target: &Path) -> Result<GenerationOutcome, SessionError> {
        let previous = read_if_exists(target)?;
        let text = self
            .generator()
            .generate(self.engine.document(), previous.as_deref())?;
        write_if_changed(target, &text)
    }

    /// Queue generation of the current state on `worker`.
    pub fn generate_in_background(&self, worker: &GenerationWorker) -> Result<GenerationTicket, SessionError> {
        let previous = read_if_exists(&self.output_path())?;
        worker.submit(&self.engine.document().capture_snapshot(), previous)
    }

    /// Write generated text to [`Self::output_path`] unless the file already
    /// holds the same bytes.
    pub fn write_generated(&self, text: &str) -> Result<GenerationOutcome, SessionError> {
        write_if_changed(&self.output_path(), text)
    }

    fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| tessel_codegen::DEFAULT_CLASS_NAME.to_owned())
    }
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

/// Write through a temp file in the target directory, then rename over the
/// target, so readers see either the old or the new content.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SessionError> {
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| SessionError::io(dir, e))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| SessionError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| SessionError::io(path, e.error))?;
    Ok(())
}

fn write_if_changed(path: &Path, text: &str) -> Result<GenerationOutcome, SessionError> {
    let path = path.to_path_buf();
    if let Some(existing) = read_if_exists(&path)? {
        if blake3::hash(existing.as_bytes()) == blake3::hash(text.as_bytes()) {
            debug!(output = %path.display(), "generated code unchanged");
            return Ok(GenerationOutcome { path, written: false });
        }
    }
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| SessionError::io(dir, e))?;
    }
    write_atomic(&path, text.as_bytes())?;
    info!(output = %path.display(), bytes = text.len(), "generated code written");
    Ok(GenerationOutcome { path, written: true })
}

fn read_if_exists(path: &Path) -> Result<Option<String>, SessionError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SessionError::io(path, e)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
