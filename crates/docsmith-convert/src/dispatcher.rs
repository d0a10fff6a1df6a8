use std::path::{Path, PathBuf};
use std::time::Duration;

use uuid::Uuid;

use crate::capability::CapabilityMap;
use crate::error::ConvertError;
use crate::plan::{ConversionKind, RasterOptions, ToolchainPaths};
use crate::runner::ToolRunner;

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub tool_timeout: Duration,
    pub raster: RasterOptions,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            tool_timeout: Duration::from_secs(120),
            raster: RasterOptions::default(),
        }
    }
}

/// Resolves conversion requests against the fixed table and drives the tool
/// passes for a job.
///
/// Each job gets a scratch directory under the output root. The input is
/// staged there under the job id so that tools which derive the output name
/// from the input stem (soffice, pdflatex) land on the expected path, and so
/// concurrent jobs over the same document never collide.
pub struct Dispatcher {
    tools: ToolchainPaths,
    runner: ToolRunner,
    capabilities: CapabilityMap,
    raster: RasterOptions,
}

impl Dispatcher {
    pub fn new(tools: ToolchainPaths, capabilities: CapabilityMap, options: ConvertOptions) -> Self {
        Self {
            tools,
            runner: ToolRunner::new(options.tool_timeout),
            capabilities,
            raster: options.raster,
        }
    }

    pub fn capabilities(&self) -> &CapabilityMap {
        &self.capabilities
    }

    /// Map a source extension and requested target onto a table entry,
    /// refusing up front when the entry's tool is not installed.
    pub fn resolve(&self, source_ext: &str, target: &str) -> Result<ConversionKind, ConvertError> {
        let kind = ConversionKind::resolve(source_ext, target).ok_or_else(|| {
            ConvertError::Unsupported {
                source_ext: source_ext.to_string(),
                target: target.to_string(),
                supported: ConversionKind::supported_targets(source_ext),
            }
        })?;
        if !self.capabilities.available(kind.tool()) {
            return Err(ConvertError::ToolNotAvailable {
                tool: kind.tool().name().to_string(),
            });
        }
        Ok(kind)
    }

    /// Run the conversion for one job. `input` is the stored source document;
    /// it is copied, never moved, so the original survives a failed run. On
    /// success the artifact sits at `{output_dir}/{job_id}.{target_ext}`.
    pub async fn execute(
        &self,
        kind: ConversionKind,
        job_id: Uuid,
        input: &Path,
        output_dir: &Path,
    ) -> Result<PathBuf, ConvertError> {
        let source_ext = input
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("bin")
            .to_ascii_lowercase();

        let scratch = output_dir.join(".work").join(job_id.to_string());
        tokio::fs::create_dir_all(&scratch).await?;

        let result = self
            .run_in_scratch(kind, job_id, input, &source_ext, &scratch, output_dir)
            .await;

        if let Err(err) = tokio::fs::remove_dir_all(&scratch).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    scratch = %scratch.display(),
                    error = %err,
                    "failed to remove conversion scratch dir"
                );
            }
        }

        result
    }

    async fn run_in_scratch(
        &self,
        kind: ConversionKind,
        job_id: Uuid,
        input: &Path,
        source_ext: &str,
        scratch: &Path,
        output_dir: &Path,
    ) -> Result<PathBuf, ConvertError> {
        let staged = scratch.join(format!("{job_id}.{source_ext}"));
        tokio::fs::copy(input, &staged).await?;

        let expected = scratch.join(format!("{}.{}", job_id, kind.target_extension()));
        let invocation = kind.invocation(&self.tools, &self.raster, &staged, scratch, &expected);

        for pass in 1..=kind.pass_count() {
            tracing::debug!(
                job_id = %job_id,
                conversion = kind.id(),
                tool = invocation.tool.name(),
                pass,
                total_passes = kind.pass_count(),
                "running conversion pass"
            );
            self.runner
                .run(
                    invocation.tool.name(),
                    &invocation.program,
                    &invocation.args,
                    scratch,
                )
                .await?;
        }

        if !tokio::fs::try_exists(&expected).await? {
            return Err(ConvertError::OutputMissing { expected });
        }

        for ext in kind.cleanup_extensions() {
            let byproduct = scratch.join(format!("{job_id}.{ext}"));
            if let Err(err) = tokio::fs::remove_file(&byproduct).await {
                if err.kind() != std::io::ErrorKind::NotFound {
                    return Err(ConvertError::Io(err));
                }
            }
        }

        let artifact = output_dir.join(format!("{}.{}", job_id, kind.target_extension()));
        tokio::fs::rename(&expected, &artifact).await?;

        tracing::info!(
            job_id = %job_id,
            conversion = kind.id(),
            artifact = %artifact.display(),
            "conversion produced artifact"
        );
        Ok(artifact)
    }
}
