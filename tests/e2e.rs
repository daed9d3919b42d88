//! End-to-end integration tests for musegen.
//!
//! These tests build a small PDF fixture at runtime and exercise both flows
//! fully offline: no API keys, no pdfium, no tesseract, and no network are
//! required. The extraction chain settles on the pure-Rust parser and the
//! image chain falls through to the local poster renderer.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use image::GenericImageView;
use musegen::{generate_lyrics, generate_poster, Config, MusegenError};
use std::path::Path;

// ── Fixture builder ──────────────────────────────────────────────────────

/// Assemble a valid single-page PDF with one Helvetica text line per entry.
/// Cross-reference offsets are computed from the byte positions of the
/// objects, so any standards-following parser can read it.
fn minimal_pdf(lines: &[&str]) -> Vec<u8> {
    let mut content = String::from("BT\n/F1 12 Tf\n72 720 Td\n14 TL\n");
    for line in lines {
        let escaped = line
            .replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)");
        content.push_str(&format!("({escaped}) Tj\nT*\n"));
    }
    content.push_str("ET\n");

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
            .to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
        format!("<< /Length {} >>\nstream\n{content}endstream", content.len()),
    ];

    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.push_str(&format!("{} 0 obj\n{body}\nendobj\n", i + 1));
    }

    let xref_offset = pdf.len();
    pdf.push_str(&format!("xref\n0 {}\n", objects.len() + 1));
    pdf.push_str("0000000000 65535 f \n");
    for off in offsets {
        pdf.push_str(&format!("{off:010} 00000 n \n"));
    }
    pdf.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
        objects.len() + 1
    ));

    pdf.into_bytes()
}

/// Fixture with a Description section long enough that OCR never triggers.
fn poster_fixture_pdf() -> Vec<u8> {
    minimal_pdf(&[
        "Project Nightfall",
        "",
        "Description",
        "A lantern-lit harbor at dusk, where quiet boats drift beneath amber skies.",
        "Deep blue water mirrors the rigging, and every window glows softly.",
        "The mood is calm, grounded, and warm against the gathering dark.",
        "",
        "Credits",
        "Studio Musegen",
    ])
}

fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("fixture write");
    path
}

// ── Poster flow ──────────────────────────────────────────────────────────

#[tokio::test]
async fn poster_flow_end_to_end_offline() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_fixture(dir.path(), "nightfall.pdf", &poster_fixture_pdf());
    let out = dir.path().join("generated_image.png");

    // Default config: no credentials, so the remote providers are skipped
    // and the local renderer must win.
    let config = Config::default();
    let run = generate_poster(pdf.to_str().unwrap(), &out, &config)
        .await
        .expect("offline poster run must succeed");

    assert!(run.extraction.success);
    assert_eq!(run.extraction.provider, Some("quick-parse"));
    assert!(
        run.description.contains("lantern-lit harbor"),
        "description should come from the Description section, got: {}",
        run.description
    );
    assert!(
        !run.description.contains("Studio Musegen"),
        "text after the next heading must not leak into the description"
    );

    assert!(run.generation.success);
    assert_eq!(run.generation.provider, Some("poster-render"));
    let summary = run.generation.details.as_deref().unwrap_or("");
    assert!(
        summary.contains("openai-images: not available"),
        "attempt trail should record the skipped OpenAI provider, got: {summary}"
    );
    assert!(
        summary.contains("stability: not available"),
        "attempt trail should record the skipped Stability provider, got: {summary}"
    );
    assert!(summary.contains("poster-render: ok"));

    // The artifact is a real PNG at the configured size.
    let bytes = std::fs::read(&out).unwrap();
    assert!(!bytes.is_empty());
    let img = image::open(&out).expect("artifact must decode as an image");
    assert_eq!(img.dimensions(), (1024, 1024));

    // Manifest sits next to the artifact and records the description.
    assert_eq!(run.manifest_path, dir.path().join("generated_image_manifest.txt"));
    let manifest = std::fs::read_to_string(&run.manifest_path).unwrap();
    assert!(manifest.contains("PDF → Image Manifest"));
    assert!(manifest.contains("# Generated: "));
    assert!(manifest.contains("## Description Used"));
    assert!(manifest.contains("lantern-lit harbor"));

    println!(
        "[poster-e2e] {} bytes via {}, {}ms",
        bytes.len(),
        run.generation.provider.unwrap_or("?"),
        run.total_duration_ms
    );
}

#[tokio::test]
async fn poster_artifact_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_fixture(dir.path(), "nightfall.pdf", &poster_fixture_pdf());
    let out_a = dir.path().join("a.png");
    let out_b = dir.path().join("b.png");

    let config = Config::default();
    let input = pdf.to_str().unwrap();
    generate_poster(input, &out_a, &config).await.unwrap();
    generate_poster(input, &out_b, &config).await.unwrap();

    assert_eq!(
        std::fs::read(&out_a).unwrap(),
        std::fs::read(&out_b).unwrap(),
        "same description must render byte-identical posters"
    );
}

#[tokio::test]
async fn textless_pdf_exhausts_the_extraction_ladder() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_fixture(dir.path(), "blank.pdf", &minimal_pdf(&[]));
    let out = dir.path().join("out.png");

    let config = Config::default();
    let err = generate_poster(pdf.to_str().unwrap(), &out, &config)
        .await
        .expect_err("a PDF with no text must not produce a poster");

    match &err {
        MusegenError::AllProvidersFailed { task, report } => {
            assert_eq!(*task, "PDF text extraction");
            assert!(report.contains("quick-parse"), "report: {report}");
            assert!(report.contains("ocr"), "report: {report}");
        }
        other => panic!("expected AllProvidersFailed, got: {other}"),
    }
    assert!(!out.exists(), "no artifact may be written on failure");

    println!("[exhaustion-e2e]\n{err}");
}

#[tokio::test]
async fn missing_pdf_is_a_typed_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.png");

    let config = Config::default();
    let err = generate_poster("/definitely/not/a/real/file.pdf", &out, &config)
        .await
        .expect_err("nonexistent input must fail");
    assert!(matches!(err, MusegenError::FileNotFound { .. }));
}

#[tokio::test]
async fn non_pdf_file_fails_the_signature_check() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = write_fixture(dir.path(), "notes.pdf", b"just some text, no header");
    let out = dir.path().join("out.png");

    let config = Config::default();
    let err = generate_poster(bogus.to_str().unwrap(), &out, &config)
        .await
        .expect_err("a non-PDF file must be rejected before extraction");
    assert!(matches!(err, MusegenError::SignatureMismatch { .. }));
}

// ── Lyrics flow ──────────────────────────────────────────────────────────

#[tokio::test]
async fn lyrics_flow_end_to_end_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let transcript = dir.path().join("closing-talk.txt");
    std::fs::write(
        &transcript,
        "Thank you all for staying until the end. Tonight we celebrated every \
         small victory together. Remember that the harbor lights will guide \
         you home. Keep singing until the morning finds you. Nothing about \
         this year was easy, and still the music carried us through the \
         winter. Hold each other close when the storms return.",
    )
    .unwrap();
    let out = dir.path().join("lyrics_output.txt");

    let config = Config::default();
    let run = generate_lyrics(transcript.to_str().unwrap(), "electronic", &out, &config)
        .await
        .expect("lyrics run from a local file must succeed");

    assert_eq!(run.style, "electronic");
    assert_eq!(run.retrieval.provider, Some("local-file"));

    let lyrics = std::fs::read_to_string(&out).unwrap();
    assert_eq!(lyrics, run.lyrics);
    assert!(lyrics.starts_with("[Verse 1]"));
    assert!(lyrics.contains("[Chorus]"));
    assert!(lyrics.contains("[Verse 2]"));
    assert!(
        lyrics.lines().all(|l| l.chars().count() <= 70),
        "every lyrics line must respect the wrap width"
    );

    assert_eq!(run.manifest_path, dir.path().join("lyrics_output_manifest.txt"));
    let manifest = std::fs::read_to_string(&run.manifest_path).unwrap();
    assert!(manifest.contains("Transcript → Lyrics Manifest"));
    assert!(manifest.contains("## Source Used"));
    assert!(manifest.contains("harbor lights"));

    println!("[lyrics-e2e]\n{lyrics}");
}

#[tokio::test]
async fn unknown_style_falls_back_to_pop_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let transcript = dir.path().join("talk.txt");
    std::fs::write(&transcript, "Every journey starts with a single honest step.").unwrap();

    let config = Config::default();
    let source = transcript.to_str().unwrap();

    let out_unknown = dir.path().join("unknown.txt");
    let run_unknown = generate_lyrics(source, "vaporwave", &out_unknown, &config)
        .await
        .unwrap();
    let out_pop = dir.path().join("pop.txt");
    generate_lyrics(source, "pop", &out_pop, &config).await.unwrap();

    assert_eq!(run_unknown.style, "pop");
    assert_eq!(
        std::fs::read(&out_unknown).unwrap(),
        std::fs::read(&out_pop).unwrap(),
        "an unknown style must produce exactly the pop rendition"
    );
}

// ── Scheme validation (no network touched) ───────────────────────────────

#[tokio::test]
async fn ftp_url_is_rejected_before_any_download() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.png");

    let config = Config::default();
    let err = generate_poster("ftp://example.com/file.pdf", &out, &config)
        .await
        .expect_err("ftp must be rejected");
    match err {
        MusegenError::UnsupportedScheme { scheme, .. } => assert_eq!(scheme, "ftp"),
        other => panic!("expected UnsupportedScheme, got: {other}"),
    }
}
