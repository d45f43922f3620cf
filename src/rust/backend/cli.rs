use std::env;
use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;

use log::{debug, info};
use tempfile::TempDir;

use super::{Backend, Predictions, TrainedModel};
use crate::classifier::{ClassifierError, FastTextConfig};

/// Environment variable holding the path of the fastText executable
pub const FASTTEXT_BIN_ENV: &str = "FASTTEXT_BIN";

/// Backend driving the `fasttext` command-line executable.
///
/// Training runs `fasttext supervised`, prediction streams documents through
/// `fasttext predict-prob`, and the softmax export is assembled from two
/// `fasttext dump` calls.
#[derive(Debug, Clone)]
pub struct FastTextCli {
    binary: PathBuf,
}

impl Default for FastTextCli {
    fn default() -> Self {
        Self::from_env()
    }
}

impl FastTextCli {
    /// Uses the executable at `binary`
    pub fn new<P: AsRef<Path>>(binary: P) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
        }
    }

    /// Uses `$FASTTEXT_BIN`, falling back to `fasttext` on the `PATH`
    pub fn from_env() -> Self {
        Self::new(Self::default_binary())
    }

    pub fn default_binary() -> PathBuf {
        match env::var_os(FASTTEXT_BIN_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => PathBuf::from("fasttext"),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl Backend for FastTextCli {
    type Model = CliModel;

    fn train(&self, corpus: &Path, config: &FastTextConfig) -> Result<CliModel, ClassifierError> {
        let dir = TempDir::new()?;
        let output_prefix = dir.path().join("model");

        let mut command = Command::new(&self.binary);
        command
            .arg("supervised")
            .arg("-input")
            .arg(corpus)
            .arg("-output")
            .arg(&output_prefix)
            .args(config.to_args());

        info!("Training fastText model from {:?}", corpus);
        run_command(command)?;

        let model_path = output_prefix.with_extension("bin");
        if !model_path.exists() {
            return Err(ClassifierError::BackendError(format!(
                "fasttext did not produce a model at {:?}",
                model_path
            )));
        }
        info!("Model written to {:?}", model_path);

        Ok(CliModel {
            binary: self.binary.clone(),
            model_path,
            _dir: dir,
        })
    }
}

/// A model trained by [`FastTextCli`].
///
/// The `.bin` file lives in a private temporary directory that is removed
/// when the model is dropped; use [`CliModel::save_model`] to keep a copy.
#[derive(Debug)]
pub struct CliModel {
    binary: PathBuf,
    model_path: PathBuf,
    _dir: TempDir,
}

impl CliModel {
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Copies the trained `.bin` model to `path`
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> Result<(), ClassifierError> {
        fs::copy(&self.model_path, path.as_ref())?;
        info!("Saved fastText model to {:?}", path.as_ref());
        Ok(())
    }

    fn dump(&self, section: &str) -> Result<String, ClassifierError> {
        let mut command = Command::new(&self.binary);
        command.arg("dump").arg(&self.model_path).arg(section);
        let output = run_command(command)?;
        String::from_utf8(output.stdout).map_err(|e| {
            ClassifierError::ParseError(format!("fasttext dump {} is not UTF-8: {}", section, e))
        })
    }
}

impl TrainedModel for CliModel {
    fn predict(&self, docs: &[String], k: usize) -> Result<Predictions, ClassifierError> {
        if docs.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(pos) = docs.iter().position(|d| d.contains(['\n', '\r'])) {
            return Err(ClassifierError::ValidationError(format!(
                "Document {} contains a line break",
                pos
            )));
        }

        let mut command = Command::new(&self.binary);
        command
            .arg("predict-prob")
            .arg(&self.model_path)
            .arg("-")
            .arg(k.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!("Running {:?}", command);

        let mut child = command.spawn().map_err(|e| launch_error(command.get_program(), e))?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClassifierError::BackendError("fasttext stdin unavailable".into()))?;

        let mut input = docs.join("\n");
        input.push('\n');
        // Feed stdin from another thread so a full stdout pipe cannot block us.
        let writer = thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child.wait_with_output()?;
        check_status(&output)?;
        writer
            .join()
            .map_err(|_| ClassifierError::BackendError("stdin writer panicked".into()))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let predictions = stdout
            .lines()
            .map(parse_prediction_line)
            .collect::<Result<Predictions, _>>()?;

        if predictions.len() != docs.len() {
            return Err(ClassifierError::BackendError(format!(
                "fasttext returned {} predictions for {} documents",
                predictions.len(),
                docs.len()
            )));
        }
        Ok(predictions)
    }

    fn save_softmax(&self, path: &Path) -> Result<(), ClassifierError> {
        let dict = self.dump("dict")?;
        let output = self.dump("output")?;
        let export = build_softmax_export(&dict, &output)?;
        fs::write(path, export)?;
        debug!("Wrote softmax export to {:?}", path);
        Ok(())
    }
}

fn launch_error(program: &OsStr, err: std::io::Error) -> ClassifierError {
    ClassifierError::BackendError(format!("Failed to launch {:?}: {}", program, err))
}

fn run_command(mut command: Command) -> Result<Output, ClassifierError> {
    debug!("Running {:?}", command);
    let output = command
        .output()
        .map_err(|e| launch_error(command.get_program(), e))?;
    check_status(&output)?;
    Ok(output)
}

fn check_status(output: &Output) -> Result<(), ClassifierError> {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        debug!("fasttext stderr: {}", stderr);
    }
    if !output.status.success() {
        return Err(ClassifierError::BackendError(format!(
            "fasttext exited with {}: {}",
            output.status, stderr
        )));
    }
    Ok(())
}

/// Parses one `predict-prob` output line: `<label> <prob> <label> <prob> ...`
pub(crate) fn parse_prediction_line(line: &str) -> Result<Vec<(String, f32)>, ClassifierError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() % 2 != 0 {
        return Err(ClassifierError::ParseError(format!(
            "Unpaired label/probability in prediction line {:?}",
            line
        )));
    }

    fields
        .chunks(2)
        .map(|pair| {
            let prob: f32 = pair[1].parse().map_err(|e| {
                ClassifierError::ParseError(format!("Invalid probability {:?}: {}", pair[1], e))
            })?;
            Ok((pair[0].to_string(), prob))
        })
        .collect()
}

/// Joins `fasttext dump <model> dict` and `fasttext dump <model> output` into
/// the softmax export format.
///
/// Labels come from the dictionary entries typed `label`, in dictionary order,
/// which is the row order of the output matrix.
pub(crate) fn build_softmax_export(dict: &str, output: &str) -> Result<String, ClassifierError> {
    let labels: Vec<&str> = dict
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let word = fields.next()?;
            let kind = fields.nth(1)?;
            (kind == "label").then_some(word)
        })
        .collect();

    let mut lines = output.lines();
    let header = lines
        .next()
        .ok_or_else(|| ClassifierError::ParseError("Empty output matrix dump".into()))?;
    let dims: Vec<usize> = header
        .split_whitespace()
        .map(|v| v.parse())
        .collect::<Result<_, _>>()
        .map_err(|e| {
            ClassifierError::ParseError(format!("Invalid matrix header {:?}: {}", header, e))
        })?;
    let (rows, cols) = match dims.as_slice() {
        [rows, cols] => (*rows, *cols),
        _ => {
            return Err(ClassifierError::ParseError(format!(
                "Invalid matrix header {:?}",
                header
            )))
        }
    };

    if rows != labels.len() {
        return Err(ClassifierError::BackendError(format!(
            "Output matrix has {} rows but the dictionary has {} labels",
            rows,
            labels.len()
        )));
    }

    let mut export = format!("{} {}\n", rows, cols);
    for (label, row) in labels.iter().zip(lines.by_ref()) {
        export.push_str(label);
        for value in row.split_whitespace() {
            export.push(' ');
            export.push_str(value);
        }
        export.push_str(" \n");
    }
    Ok(export)
}
