use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;

use uuid::Uuid;

use docsmith_convert::{
    CapabilityMap, ConversionKind, ConvertError, ConvertOptions, Dispatcher, ToolchainPaths,
};

fn write_tool(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path.to_string_lossy().into_owned()
}

/// Toolchain where every slot defaults to `true` (exists, exits 0) unless a
/// test wires in a fake script.
fn toolchain() -> ToolchainPaths {
    ToolchainPaths {
        soffice: "true".into(),
        magick: "true".into(),
        pandoc: "true".into(),
        pdflatex: "true".into(),
    }
}

async fn dispatcher(tools: ToolchainPaths, timeout: Duration) -> Dispatcher {
    let capabilities = CapabilityMap::probe(&tools).await;
    Dispatcher::new(
        tools,
        capabilities,
        ConvertOptions {
            tool_timeout: timeout,
            ..ConvertOptions::default()
        },
    )
}

fn write_input(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn conversion_produces_artifact_under_job_id() {
    let bin = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    // pandoc argv shape: <input> -o <output>
    let mut tools = toolchain();
    tools.pandoc = write_tool(bin.path(), "pandoc", r#"cp "$1" "$3""#);

    let dispatcher = dispatcher(tools, Duration::from_secs(5)).await;
    let input = write_input(data.path(), "report.pdf", "pdf-bytes");
    let job_id = Uuid::new_v4();

    let artifact = dispatcher
        .execute(ConversionKind::PdfToLatex, job_id, &input, out.path())
        .await
        .unwrap();

    assert_eq!(artifact, out.path().join(format!("{job_id}.tex")));
    assert_eq!(std::fs::read_to_string(&artifact).unwrap(), "pdf-bytes");
    // scratch dir is reclaimed, input is untouched
    assert!(!out.path().join(".work").join(job_id.to_string()).exists());
    assert!(input.exists());
}

#[tokio::test]
async fn failing_tool_short_circuits_remaining_passes() {
    let bin = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let counter = bin.path().join("invocations");

    // the capability probe also invokes the tool; only conversion passes count
    let mut tools = toolchain();
    tools.pdflatex = write_tool(
        bin.path(),
        "pdflatex",
        &format!(
            r#"[ "$1" = "--version" ] && exit 0
echo run >> "{}"
echo "conversion exploded" >&2
exit 1"#,
            counter.display()
        ),
    );

    let dispatcher = dispatcher(tools, Duration::from_secs(5)).await;
    let input = write_input(data.path(), "paper.tex", "\\documentclass{article}");
    let err = dispatcher
        .execute(ConversionKind::LatexToPdf, Uuid::new_v4(), &input, out.path())
        .await
        .unwrap_err();

    match err {
        ConvertError::ToolFailed {
            exit_code, detail, ..
        } => {
            assert_eq!(exit_code, Some(1));
            assert!(detail.contains("conversion exploded"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // two passes are planned, but the first failure stops the run
    let runs = std::fs::read_to_string(&counter).unwrap();
    assert_eq!(runs.lines().count(), 1);
    assert!(input.exists());
}

#[tokio::test]
async fn latex_runs_twice_and_sweeps_byproducts() {
    let bin = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let counter = bin.path().join("invocations");

    // pdflatex argv shape: -interaction=nonstopmode -output-directory <dir> <input>
    let mut tools = toolchain();
    tools.pdflatex = write_tool(
        bin.path(),
        "pdflatex",
        &format!(
            r#"[ "$1" = "--version" ] && exit 0
echo run >> "{}"
dir="$3"
base=$(basename "$4")
stem="${{base%.tex}}"
printf 'pdf' > "$dir/$stem.pdf"
printf 'aux' > "$dir/$stem.aux"
printf 'log' > "$dir/$stem.log""#,
            counter.display()
        ),
    );

    let dispatcher = dispatcher(tools, Duration::from_secs(5)).await;
    let input = write_input(data.path(), "paper.tex", "\\documentclass{article}");
    let job_id = Uuid::new_v4();

    let artifact = dispatcher
        .execute(ConversionKind::LatexToPdf, job_id, &input, out.path())
        .await
        .unwrap();

    let runs = std::fs::read_to_string(&counter).unwrap();
    assert_eq!(runs.lines().count(), 2);
    assert_eq!(artifact, out.path().join(format!("{job_id}.pdf")));
    assert!(!out.path().join(".work").join(job_id.to_string()).exists());
}

#[tokio::test]
async fn zero_exit_without_output_is_reported() {
    let bin = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let mut tools = toolchain();
    tools.pandoc = write_tool(bin.path(), "pandoc", "exit 0");

    let dispatcher = dispatcher(tools, Duration::from_secs(5)).await;
    let input = write_input(data.path(), "report.pdf", "pdf-bytes");
    let err = dispatcher
        .execute(ConversionKind::PdfToLatex, Uuid::new_v4(), &input, out.path())
        .await
        .unwrap_err();

    assert!(matches!(err, ConvertError::OutputMissing { .. }));
}

#[tokio::test]
async fn hung_tool_is_killed_at_the_deadline() {
    let bin = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let mut tools = toolchain();
    tools.pandoc = write_tool(bin.path(), "pandoc", "sleep 30");

    let dispatcher = dispatcher(tools, Duration::from_millis(200)).await;
    let input = write_input(data.path(), "report.pdf", "pdf-bytes");
    let started = std::time::Instant::now();
    let err = dispatcher
        .execute(ConversionKind::PdfToLatex, Uuid::new_v4(), &input, out.path())
        .await
        .unwrap_err();

    assert!(matches!(err, ConvertError::TimedOut { .. }));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn unsupported_pair_lists_reachable_targets() {
    let dispatcher = dispatcher(toolchain(), Duration::from_secs(5)).await;
    let err = dispatcher.resolve("pdf", "png").unwrap_err();
    match err {
        ConvertError::Unsupported {
            source_ext,
            target,
            mut supported,
        } => {
            assert_eq!(source_ext, "pdf");
            assert_eq!(target, "png");
            supported.sort();
            assert_eq!(supported, vec!["docx", "jpg", "tex"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn resolve_refuses_conversions_whose_tool_is_missing() {
    let mut tools = toolchain();
    tools.pandoc = "no-such-pandoc-bin-49c1".into();
    let dispatcher = dispatcher(tools, Duration::from_secs(5)).await;

    let err = dispatcher.resolve("pdf", "tex").unwrap_err();
    assert!(matches!(
        err,
        ConvertError::ToolNotAvailable { tool } if tool == "pandoc"
    ));
    // other table entries stay usable
    assert!(dispatcher.resolve("pdf", "docx").is_ok());
}

#[tokio::test]
async fn concurrent_jobs_over_one_document_do_not_collide() {
    let bin = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let mut tools = toolchain();
    tools.pandoc = write_tool(bin.path(), "pandoc", r#"cp "$1" "$3""#);

    let dispatcher = dispatcher(tools, Duration::from_secs(5)).await;
    let input = write_input(data.path(), "report.pdf", "pdf-bytes");

    let job_a = Uuid::new_v4();
    let job_b = Uuid::new_v4();
    let (a, b) = tokio::join!(
        dispatcher.execute(ConversionKind::PdfToLatex, job_a, &input, out.path()),
        dispatcher.execute(ConversionKind::PdfToLatex, job_b, &input, out.path()),
    );

    let a = a.unwrap();
    let b = b.unwrap();
    assert_ne!(a, b);
    assert!(a.exists());
    assert!(b.exists());
}
