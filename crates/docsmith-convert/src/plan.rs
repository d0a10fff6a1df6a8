use std::ffi::OsString;
use std::path::Path;

/// Filesystem paths (or bare command names) for the external tools.
#[derive(Debug, Clone)]
pub struct ToolchainPaths {
    pub soffice: String,
    pub magick: String,
    pub pandoc: String,
    pub pdflatex: String,
}

impl Default for ToolchainPaths {
    fn default() -> Self {
        Self {
            soffice: "soffice".to_string(),
            magick: "convert".to_string(),
            pandoc: "pandoc".to_string(),
            pdflatex: "pdflatex".to_string(),
        }
    }
}

/// The external programs the engine shells out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Soffice,
    Magick,
    Pandoc,
    Pdflatex,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::Soffice,
        ToolKind::Magick,
        ToolKind::Pandoc,
        ToolKind::Pdflatex,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Soffice => "soffice",
            ToolKind::Magick => "convert",
            ToolKind::Pandoc => "pandoc",
            ToolKind::Pdflatex => "pdflatex",
        }
    }

    pub fn program<'a>(&self, tools: &'a ToolchainPaths) -> &'a str {
        match self {
            ToolKind::Soffice => &tools.soffice,
            ToolKind::Magick => &tools.magick,
            ToolKind::Pandoc => &tools.pandoc,
            ToolKind::Pdflatex => &tools.pdflatex,
        }
    }

    /// Argument used to probe the binary at startup.
    pub fn probe_arg(&self) -> &'static str {
        match self {
            ToolKind::Magick => "-version",
            _ => "--version",
        }
    }
}

/// Tuning knobs that feed into tool argument lists.
#[derive(Debug, Clone, Copy)]
pub struct RasterOptions {
    pub density: u32,
    pub quality: u32,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            density: 300,
            quality: 90,
        }
    }
}

/// A single resolved tool invocation. Arguments are literal, never passed
/// through a shell.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub tool: ToolKind,
    pub program: String,
    pub args: Vec<OsString>,
}

/// The fixed conversion table. Each variant pins one tool with one argument
/// shape; there is no generic "run anything" path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionKind {
    PdfToWord,
    WordToPdf,
    PdfToJpeg,
    PdfToLatex,
    LatexToPdf,
}

impl ConversionKind {
    pub const ALL: [ConversionKind; 5] = [
        ConversionKind::PdfToWord,
        ConversionKind::WordToPdf,
        ConversionKind::PdfToJpeg,
        ConversionKind::PdfToLatex,
        ConversionKind::LatexToPdf,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            ConversionKind::PdfToWord => "pdf_to_word",
            ConversionKind::WordToPdf => "word_to_pdf",
            ConversionKind::PdfToJpeg => "pdf_to_jpeg",
            ConversionKind::PdfToLatex => "pdf_to_latex",
            ConversionKind::LatexToPdf => "latex_to_pdf",
        }
    }

    pub fn source_extensions(&self) -> &'static [&'static str] {
        match self {
            ConversionKind::PdfToWord => &["pdf"],
            ConversionKind::WordToPdf => &["doc", "docx"],
            ConversionKind::PdfToJpeg => &["pdf"],
            ConversionKind::PdfToLatex => &["pdf"],
            ConversionKind::LatexToPdf => &["tex"],
        }
    }

    pub fn target_extension(&self) -> &'static str {
        match self {
            ConversionKind::PdfToWord => "docx",
            ConversionKind::WordToPdf => "pdf",
            ConversionKind::PdfToJpeg => "jpg",
            ConversionKind::PdfToLatex => "tex",
            ConversionKind::LatexToPdf => "pdf",
        }
    }

    pub fn tool(&self) -> ToolKind {
        match self {
            ConversionKind::PdfToWord | ConversionKind::WordToPdf => ToolKind::Soffice,
            ConversionKind::PdfToJpeg => ToolKind::Magick,
            ConversionKind::PdfToLatex => ToolKind::Pandoc,
            ConversionKind::LatexToPdf => ToolKind::Pdflatex,
        }
    }

    /// How many times the same invocation runs. LaTeX needs a second pass to
    /// settle cross-references.
    pub fn pass_count(&self) -> u32 {
        match self {
            ConversionKind::LatexToPdf => 2,
            _ => 1,
        }
    }

    /// Byproduct extensions removed from the scratch dir after a successful run.
    pub fn cleanup_extensions(&self) -> &'static [&'static str] {
        match self {
            ConversionKind::LatexToPdf => &["aux", "log", "out"],
            _ => &[],
        }
    }

    /// Resolve a conversion from a source extension and requested target.
    /// The target may be an action id (`pdf_to_word`) or a bare format
    /// (`docx`, `jpg`); both are matched case-insensitively.
    pub fn resolve(source_ext: &str, target: &str) -> Option<ConversionKind> {
        let source_ext = source_ext.to_ascii_lowercase();
        let target = target.to_ascii_lowercase();
        Self::ALL.iter().copied().find(|kind| {
            let source_ok = kind
                .source_extensions()
                .iter()
                .any(|ext| *ext == source_ext);
            let target_ok = kind.id() == target
                || kind.target_extension() == target
                || (*kind == ConversionKind::PdfToJpeg && target == "jpeg");
            source_ok && target_ok
        })
    }

    /// Target formats reachable from a given source extension.
    pub fn supported_targets(source_ext: &str) -> Vec<String> {
        let source_ext = source_ext.to_ascii_lowercase();
        Self::ALL
            .iter()
            .filter(|kind| kind.source_extensions().iter().any(|ext| *ext == source_ext))
            .map(|kind| kind.target_extension().to_string())
            .collect()
    }

    /// Build the argv for one pass. `input` is the staged source file,
    /// `scratch` the per-job working directory, `output` the expected
    /// artifact path inside `scratch`.
    pub fn invocation(
        &self,
        tools: &ToolchainPaths,
        raster: &RasterOptions,
        input: &Path,
        scratch: &Path,
        output: &Path,
    ) -> ToolInvocation {
        let tool = self.tool();
        let args: Vec<OsString> = match self {
            ConversionKind::PdfToWord | ConversionKind::WordToPdf => vec![
                "--headless".into(),
                "--convert-to".into(),
                self.target_extension().into(),
                "--outdir".into(),
                scratch.into(),
                input.into(),
            ],
            ConversionKind::PdfToJpeg => vec![
                "-density".into(),
                raster.density.to_string().into(),
                // [0] pins the first page so multi-page PDFs still yield a
                // single artifact at the expected path.
                format!("{}[0]", input.display()).into(),
                "-quality".into(),
                raster.quality.to_string().into(),
                output.into(),
            ],
            ConversionKind::PdfToLatex => {
                vec![input.into(), "-o".into(), output.into()]
            }
            ConversionKind::LatexToPdf => vec![
                "-interaction=nonstopmode".into(),
                "-output-directory".into(),
                scratch.into(),
                input.into(),
            ],
        };
        ToolInvocation {
            tool,
            program: tool.program(tools).to_string(),
            args,
        }
    }
}
