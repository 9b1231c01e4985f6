use super::{TextExtractor, types::*};
use crate::{config::Config, input::Image};
use anyhow::{Context, Result, anyhow};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdout, Command, Output, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const RUNNER_SCRIPT: &str = "ocr_runner.py";

/// Text extractor backed by a PaddleOCR runner script.
///
/// Each call spawns one interpreter, writes a JSON request on stdin and reads
/// a single JSON document from stdout.
pub struct PythonOcr {
    cfg: Config,
    script: PathBuf,
    python_exe: PathBuf,
}

impl PythonOcr {
    pub fn new(cfg: &Config) -> Result<Self> {
        let scripts_dir = PathBuf::from(&cfg.paths.scripts_dir);
        if cfg.security.pin_scripts_dir {
            let cwd = std::env::current_dir().with_context(|| "current_dir")?;
            let canon = scripts_dir
                .canonicalize()
                .with_context(|| format!("canonicalize scripts_dir: {}", scripts_dir.display()))?;
            if !canon.starts_with(&cwd) {
                return Err(anyhow!(
                    "scripts_dir is outside cwd while pin_scripts_dir=true: {}",
                    canon.display()
                ));
            }
        }
        let script = scripts_dir.join(RUNNER_SCRIPT);
        if !script.exists() {
            return Err(anyhow!("missing script: {}", script.display()));
        }
        let python_exe = resolve_python_exe(&cfg.ocr.python_exe);
        Ok(Self {
            cfg: cfg.clone(),
            script,
            python_exe,
        })
    }

    pub fn python_exe(&self) -> &Path {
        &self.python_exe
    }

    /// Asks the runner to import PaddleOCR and report versions.
    pub fn doctor(&self) -> Result<OcrDiag> {
        self.run_json(
            &serde_json::json!({"cmd": "doctor"}),
            Some(self.cfg.ocr.doctor_timeout_seconds),
        )
    }

    fn run_json<I: serde::Serialize, O: for<'de> serde::Deserialize<'de>>(
        &self,
        input: &I,
        timeout_seconds: Option<u64>,
    ) -> Result<O> {
        debug!(
            "python run {} timeout={:?}",
            self.script.display(),
            timeout_seconds
        );
        let mut cmd = Command::new(&self.python_exe);
        cmd.arg(&self.script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (k, v) in &self.cfg.ocr.env {
            cmd.env(k, v);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning python: {}", self.python_exe.display()))?;

        {
            let mut stdin = child.stdin.take().ok_or_else(|| anyhow!("no stdin"))?;
            let bytes = serde_json::to_vec(input)?;
            stdin.write_all(&bytes).with_context(|| "writing OCR request")?;
            stdin.flush().ok();
        }

        let output = match timeout_seconds.filter(|s| *s > 0) {
            Some(secs) => wait_with_timeout(&mut child, Duration::from_secs(secs))?,
            None => child
                .wait_with_output()
                .with_context(|| "waiting for python")?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("OCR runner exited with {}\n{}", output.status, stderr.trim()));
        }

        if self.cfg.debug.keep_python_stderr && !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("OCR runner stderr: {}", stderr.trim());
        }

        serde_json::from_slice(&output.stdout).with_context(|| "parsing OCR runner JSON output")
    }
}

impl TextExtractor for PythonOcr {
    fn extract(&self, image: &Image) -> Result<Vec<TextGroup>> {
        let req = OcrIn {
            image_base64: STANDARD.encode(&image.bytes),
            lang: self.cfg.ocr.lang.clone(),
            use_angle_cls: self.cfg.ocr.use_angle_cls,
            cls: self.cfg.ocr.cls,
        };
        let out: OcrOut = self.run_json(&req, Some(self.cfg.ocr.timeout_seconds))?;
        if !out.ok {
            let msg = out.error.unwrap_or_else(|| "OCR runner returned ok=false".to_string());
            return Err(anyhow!(msg));
        }
        debug!(
            source = %image.source,
            groups = out.groups.len(),
            fragments = out.groups.iter().map(Vec::len).sum::<usize>(),
            "ocr done"
        );
        Ok(out.groups)
    }
}

fn resolve_python_exe(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("auto") {
        if let Ok(env_val) = std::env::var("PADDLEOCR_PYTHON") {
            let p = expand_tilde(&env_val);
            if p.exists() {
                return p;
            }
        }
        let venv = PathBuf::from(".venv/bin/python");
        if venv.exists() {
            return venv;
        }
        return PathBuf::from("python3");
    }
    expand_tilde(raw)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

fn drain<R: Read + Send + 'static>(reader: Option<R>, what: &'static str) -> JoinHandle<Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut r) = reader {
            r.read_to_end(&mut buf).with_context(|| format!("read {what}"))?;
        }
        Ok(buf)
    })
}

fn collect(
    status: std::process::ExitStatus,
    stdout: JoinHandle<Result<Vec<u8>>>,
    stderr: JoinHandle<Result<Vec<u8>>>,
) -> Result<Output> {
    let stdout = stdout
        .join()
        .map_err(|_| anyhow!("stdout reader thread panicked"))??;
    let stderr = stderr
        .join()
        .map_err(|_| anyhow!("stderr reader thread panicked"))??;
    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Output> {
    // PaddleOCR logs heavily; keep both pipes drained so the child never blocks on write.
    let stdout = drain::<ChildStdout>(child.stdout.take(), "stdout");
    let stderr = drain::<ChildStderr>(child.stderr.take(), "stderr");

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            return collect(status, stdout, stderr);
        }

        if start.elapsed() > timeout {
            warn!("OCR runner timed out after {:?}", timeout);
            let _ = child.kill();
            let status = child.wait().with_context(|| "wait after kill")?;
            let output = collect(status, stdout, stderr)?;
            return Err(anyhow!(
                "OCR runner exceeded timeout ({:?}); stderr: {}",
                timeout,
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}
