use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tsforge::build::OutputCleaner;
use tsforge::config::ResolvedConfig;
use tsforge::exec::{BoxFuture, CompileBackend, CompileOutput};
use tsforge::options::{BuildOptions, dts_extension};
use tsforge::types::OutputFormat;

/// Records every `BuildOptions` it receives and succeeds without writing
/// anything, unless told to fail a format.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    calls: Arc<Mutex<Vec<BuildOptions>>>,
    failing: Arc<Mutex<HashSet<OutputFormat>>>,
    delay: Option<Duration>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Primary passes for `format` fail with a diagnostic.
    pub fn fail_on(self, format: OutputFormat) -> Self {
        self.failing.lock().unwrap().insert(format);
        self
    }

    /// Stop failing `format` (shared by clones).
    pub fn heal(&self, format: OutputFormat) {
        self.failing.lock().unwrap().remove(&format);
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<BuildOptions> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl CompileBackend for RecordingBackend {
    fn compile(&self, options: BuildOptions) -> BoxFuture<'_, Result<CompileOutput, String>> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let format = options.requested_format;
            let declarations_only = options.output.declarations_only;
            self.calls.lock().unwrap().push(options);

            if !declarations_only && self.failing.lock().unwrap().contains(&format) {
                return Err(format!("forced failure for {format}"));
            }
            Ok(CompileOutput::default())
        })
    }
}

/// A stand-in engine that copies each entry to the output directory.
///
/// - output names come from the `entry_file_names` template
/// - `define` keys are substituted textually
/// - relative imports of sibling entries are rewritten to the sibling's
///   output file name, so cross-entry references resolve in the output
/// - a declarations-only pass writes `<name><dts ext>` stubs instead
#[derive(Clone, Default)]
pub struct TranscribingBackend {
    invocations: Arc<AtomicUsize>,
}

impl TranscribingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    fn transcribe(options: &BuildOptions) -> std::io::Result<CompileOutput> {
        let out = &options.output;
        let ext = out.entry_file_names.trim_start_matches("[name]");
        fs::create_dir_all(&out.dir)?;

        let mut output = CompileOutput::default();
        for (name, source) in &options.input.entries {
            output.watch_files.push(source.clone());

            if out.declarations_only {
                let path = out.dir.join(format!("{name}{}", dts_extension(ext)));
                fs::write(&path, format!("// declarations for {name}\nexport {{}};\n"))?;
                output.files.push(path);
                continue;
            }

            let mut code = fs::read_to_string(source)?;
            for (key, value) in &options.input.define {
                code = code.replace(key.as_str(), value);
            }
            for sibling in options.input.entries.keys() {
                for quote in ['"', '\''] {
                    let from = format!("{quote}./{sibling}{quote}");
                    let to = format!("{quote}./{sibling}{ext}{quote}");
                    code = code.replace(&from, &to);
                }
            }

            let header = match out.format {
                OutputFormat::Cjs => "\"use strict\";\n",
                _ => "",
            };
            let path = out.dir.join(out.entry_file_names.replace("[name]", name));
            fs::write(&path, format!("{header}{code}"))?;
            output.files.push(path);
        }
        Ok(output)
    }
}

impl CompileBackend for TranscribingBackend {
    fn compile(&self, options: BuildOptions) -> BoxFuture<'_, Result<CompileOutput, String>> {
        Box::pin(async move {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            Self::transcribe(&options).map_err(|e| e.to_string())
        })
    }
}

/// Counts clean calls and records the configs they were for.
#[derive(Clone, Default)]
pub struct CountingCleaner {
    calls: Arc<Mutex<Vec<PathBuf>>>,
    delay: Option<Duration>,
}

impl CountingCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold each clean open so concurrent format tasks pile up on it.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn cleaned_dirs(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

impl OutputCleaner for CountingCleaner {
    fn clean<'a>(&'a self, config: &'a ResolvedConfig) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(config.out_dir.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(())
        })
    }
}

