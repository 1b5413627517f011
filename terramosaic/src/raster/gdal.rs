//! GDAL command-line raster engine.
//!
//! Invokes the GDAL utilities (`gdalwarp`, `gdal_calc.py`,
//! `gdal_polygonize.py`, `gdal_merge.py`, `gdalenhance`) as external
//! processes. Arguments are always passed as a vector; paths are never
//! interpolated into a shell string.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::debug;

use super::types::{RasterEngine, RasterError, Resampling};
use crate::territory::{BoundingBox, GeoJson};

/// Raster engine backed by the GDAL CLI toolchain.
pub struct GdalRasterEngine {
    /// Optional per-invocation timeout. `None` lets every call run to
    /// completion, matching the original behavior.
    timeout: Option<Duration>,
}

impl GdalRasterEngine {
    /// Create an engine with no per-call timeout.
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// Set a timeout applied to every tool invocation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Prefix remote sources for GDAL's virtual curl filesystem.
    fn vsi_source(source: &str) -> String {
        if source.starts_with("http://") || source.starts_with("https://") {
            format!("/vsicurl/{}", source)
        } else {
            source.to_string()
        }
    }

    fn run(&self, tool: &str, args: &[String]) -> Result<(), RasterError> {
        debug!(tool = tool, args = ?args, "Invoking raster tool");

        let spawn_err = |source| RasterError::Spawn {
            tool: tool.to_string(),
            source,
        };

        let mut child = Command::new(tool)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        // Drain stderr on its own thread; a tool filling the pipe would
        // otherwise block forever inside the wait loop below.
        let stderr_pipe = child.stderr.take();
        let drain = std::thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stderr_pipe {
                let _ = Read::read_to_end(&mut pipe, &mut buf);
            }
            buf
        });

        let status = if let Some(timeout) = self.timeout {
            let started = Instant::now();
            loop {
                match child.try_wait().map_err(spawn_err)? {
                    Some(status) => break status,
                    None if started.elapsed() > timeout => {
                        let _ = child.kill();
                        let _ = child.wait();
                        let _ = drain.join();
                        return Err(RasterError::Timeout {
                            tool: tool.to_string(),
                            timeout_secs: timeout.as_secs(),
                        });
                    }
                    None => std::thread::sleep(Duration::from_millis(100)),
                }
            }
        } else {
            child.wait().map_err(spawn_err)?
        };

        let stderr = drain.join().unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            let status = match status.code() {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            };
            Err(RasterError::ToolFailed {
                tool: tool.to_string(),
                status,
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            })
        }
    }
}

impl Default for GdalRasterEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterEngine for GdalRasterEngine {
    fn warp_to_resolution(
        &self,
        source: &str,
        dest: &Path,
        x_res: f64,
        y_res: f64,
        resampling: Resampling,
        target_srs: &str,
    ) -> Result<(), RasterError> {
        let args = vec![
            "-tr".to_string(),
            x_res.to_string(),
            y_res.to_string(),
            "-r".to_string(),
            resampling.as_str().to_string(),
            "-t_srs".to_string(),
            target_srs.to_string(),
            "-overwrite".to_string(),
            Self::vsi_source(source),
            dest.to_string_lossy().into_owned(),
        ];
        self.run("gdalwarp", &args)
    }

    fn warp_to_bbox(
        &self,
        source: &str,
        dest: &Path,
        bbox: &BoundingBox,
        width_px: u32,
        height_px: u32,
        resampling: Resampling,
        target_srs: &str,
    ) -> Result<(), RasterError> {
        let args = vec![
            "-te".to_string(),
            bbox.min_x.to_string(),
            bbox.min_y.to_string(),
            bbox.max_x.to_string(),
            bbox.max_y.to_string(),
            "-te_srs".to_string(),
            target_srs.to_string(),
            "-ts".to_string(),
            width_px.to_string(),
            height_px.to_string(),
            "-t_srs".to_string(),
            target_srs.to_string(),
            "-r".to_string(),
            resampling.as_str().to_string(),
            "-overwrite".to_string(),
            Self::vsi_source(source),
            dest.to_string_lossy().into_owned(),
        ];
        self.run("gdalwarp", &args)
    }

    fn band_expression(
        &self,
        input: &Path,
        expression: &str,
        nodata: f64,
        dest: &Path,
    ) -> Result<(), RasterError> {
        let input = input.to_string_lossy();
        let args = vec![
            "-A".to_string(),
            input.to_string(),
            "--A_band=1".to_string(),
            "-B".to_string(),
            input.to_string(),
            "--B_band=2".to_string(),
            "-C".to_string(),
            input.to_string(),
            "--C_band=3".to_string(),
            format!("--outfile={}", dest.to_string_lossy()),
            format!("--calc={}", expression),
            format!("--NoDataValue={}", nodata),
            "--overwrite".to_string(),
        ];
        self.run("gdal_calc.py", &args)
    }

    fn polygonize(&self, raster: &Path, dest: &Path) -> Result<GeoJson, RasterError> {
        let args = vec![
            raster.to_string_lossy().into_owned(),
            "-mask".to_string(),
            raster.to_string_lossy().into_owned(),
            "-f".to_string(),
            "GeoJSON".to_string(),
            dest.to_string_lossy().into_owned(),
        ];
        self.run("gdal_polygonize.py", &args)?;

        let raw = std::fs::read_to_string(dest).map_err(|e| RasterError::OutputUnreadable {
            path: dest.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| RasterError::OutputUnreadable {
            path: dest.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn merge(&self, inputs: &[PathBuf], dest: &Path) -> Result<(), RasterError> {
        let mut args = vec![
            "-o".to_string(),
            dest.to_string_lossy().into_owned(),
            "-of".to_string(),
            "GTiff".to_string(),
            "-co".to_string(),
            "COMPRESS=LZW".to_string(),
        ];
        args.extend(inputs.iter().map(|p| p.to_string_lossy().into_owned()));
        self.run("gdal_merge.py", &args)
    }

    fn enhance(&self, lut_config: &Path, input: &Path, dest: &Path) -> Result<(), RasterError> {
        let args = vec![
            "-config".to_string(),
            lut_config.to_string_lossy().into_owned(),
            input.to_string_lossy().into_owned(),
            dest.to_string_lossy().into_owned(),
        ];
        self.run("gdalenhance", &args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vsi_source_prefixes_remote_urls() {
        assert_eq!(
            GdalRasterEngine::vsi_source("https://x/scene.tif"),
            "/vsicurl/https://x/scene.tif"
        );
        assert_eq!(
            GdalRasterEngine::vsi_source("http://x/scene.tif"),
            "/vsicurl/http://x/scene.tif"
        );
    }

    #[test]
    fn test_vsi_source_leaves_local_paths() {
        assert_eq!(
            GdalRasterEngine::vsi_source("/tmp/scene.tif"),
            "/tmp/scene.tif"
        );
    }

    #[test]
    fn test_run_missing_tool_is_spawn_error() {
        let engine = GdalRasterEngine::new();
        let result = engine.run("terramosaic-no-such-tool", &[]);
        assert!(matches!(result, Err(RasterError::Spawn { .. })));
    }

    #[test]
    fn test_run_nonzero_exit_is_tool_failed() {
        let engine = GdalRasterEngine::new();
        // `false` exits 1 with no output on any POSIX system.
        let result = engine.run("false", &[]);
        match result {
            Err(RasterError::ToolFailed { tool, status, .. }) => {
                assert_eq!(tool, "false");
                assert_eq!(status, "exit code 1");
            }
            other => panic!("expected ToolFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_run_success() {
        let engine = GdalRasterEngine::new();
        assert!(engine.run("true", &[]).is_ok());
    }

    #[test]
    fn test_timeout_kills_long_running_tool() {
        let engine = GdalRasterEngine::new().with_timeout(Duration::from_millis(200));
        let result = engine.run("sleep", &["5".to_string()]);
        assert!(matches!(result, Err(RasterError::Timeout { .. })));
    }

    #[test]
    fn test_chatty_stderr_does_not_stall_the_wait_loop() {
        // Well past the OS pipe buffer; the failure must surface as
        // ToolFailed, not as a timeout of a wedged writer.
        let engine = GdalRasterEngine::new().with_timeout(Duration::from_secs(30));
        let script = "head -c 200000 /dev/zero | tr '\\0' x >&2; exit 3";
        let result = engine.run("sh", &["-c".to_string(), script.to_string()]);
        match result {
            Err(RasterError::ToolFailed { status, stderr, .. }) => {
                assert_eq!(status, "exit code 3");
                assert_eq!(stderr.len(), 200_000);
            }
            other => panic!("expected ToolFailed, got {:?}", other),
        }
    }
}
