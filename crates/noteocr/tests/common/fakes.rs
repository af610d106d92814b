//! Test doubles for the pipeline's outbound seams.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use noteocr::error::{ProcessError, StorageError};
use noteocr::processor::{OcrEngine, OcrSession};
use noteocr::storage::{CreatedDocument, DocumentStore, NewDocument};

/// Latch that holds recognition back until opened.
#[derive(Clone, Default)]
pub struct Gate(Arc<(Mutex<bool>, Condvar)>);

impl Gate {
    pub fn open(&self) {
        let (lock, cvar) = &*self.0;
        *lock.lock().unwrap() = true;
        cvar.notify_all();
    }

    fn wait(&self) {
        let (lock, cvar) = &*self.0;
        let mut open = lock.lock().unwrap();
        while !*open {
            open = cvar.wait(open).unwrap();
        }
    }
}

/// What one session does.
#[derive(Debug, Clone)]
pub enum Script {
    Text(String),
    OpenFails(String),
    RecognizeFails(String),
}

/// OCR engine replaying a script, one entry per opened session.
///
/// The last entry repeats once the script is exhausted.
#[derive(Clone)]
pub struct ScriptedEngine {
    script: Arc<Mutex<Vec<Script>>>,
    opened: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<PathBuf>>>,
    gate: Option<Gate>,
}

impl ScriptedEngine {
    pub fn returning(text: &str) -> Self {
        Self::sequence(vec![Script::Text(text.to_string())])
    }

    pub fn failing(message: &str) -> Self {
        Self::sequence(vec![Script::RecognizeFails(message.to_string())])
    }

    pub fn sequence(mut script: Vec<Script>) -> Self {
        script.reverse();
        Self {
            script: Arc::new(Mutex::new(script)),
            opened: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
            gate: None,
        }
    }

    /// Every recognition waits for `gate` to open.
    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Sessions successfully opened.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Sessions dropped.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Images passed to `recognize`, in call order.
    pub fn seen(&self) -> Vec<PathBuf> {
        self.seen.lock().unwrap().clone()
    }

    fn next(&self) -> Script {
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop().unwrap()
        } else {
            script.last().cloned().unwrap()
        }
    }
}

impl OcrEngine for ScriptedEngine {
    fn open(&self) -> Result<Box<dyn OcrSession>, ProcessError> {
        let step = self.next();
        if let Script::OpenFails(ref message) = step {
            return Err(ProcessError::OcrInit(message.clone()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            step,
            released: Arc::clone(&self.released),
            seen: Arc::clone(&self.seen),
            gate: self.gate.clone(),
        }))
    }
}

struct ScriptedSession {
    step: Script,
    released: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<PathBuf>>>,
    gate: Option<Gate>,
}

impl OcrSession for ScriptedSession {
    fn recognize(&mut self, image: &Path) -> Result<String, ProcessError> {
        if let Some(ref gate) = self.gate {
            gate.wait();
        }
        self.seen.lock().unwrap().push(image.to_path_buf());
        match self.step {
            Script::Text(ref text) => Ok(text.clone()),
            Script::RecognizeFails(ref message) => Err(ProcessError::OcrFailed(message.clone())),
            Script::OpenFails(_) => unreachable!("open already failed"),
        }
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Document store whose backend is always down.
pub struct FailingDocumentStore;

impl DocumentStore for FailingDocumentStore {
    fn create_document(
        &self,
        _owner_id: &str,
        _document: NewDocument,
    ) -> Result<CreatedDocument, StorageError> {
        Err(StorageError::Unavailable("documents table locked".to_string()))
    }
}
