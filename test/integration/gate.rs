// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{
    EditingCardGenerator, FixedMinifier, RepoFixture, StubCardGenerator, StubFontSubsetter,
    TruncatingCompressor,
};

use anyhow::Result;
use commit_gate::{
    checks::CheckError, Capability, Gate, GateConfig, GateError, GateReport, RepoHandle, Toolbox,
};
use indoc::indoc;
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::{env, fs, path::PathBuf};

const POST: &str = indoc! {r#"
    +++
    title = "Post"
    date = "2024-01-01"
    +++

    First paragraph.
"#};

const SITE_CONFIG: &str = indoc! {r#"
    title = "Site"

    [extra]
    stylesheets = []
"#};

fn fixture() -> Result<RepoFixture> {
    RepoFixture::new(env::current_dir()?.join("site"))
}

fn run_gate(fixture: &RepoFixture, tools: &Toolbox) -> Result<GateReport, GateError> {
    let repo = RepoHandle::discover(fixture.root())?;
    let config = GateConfig::default();
    Gate::new(&repo, &config, tools)?.run()
}

fn body_edit(text: &str) -> String {
    text.replace("First paragraph.", "First paragraph, revised.")
}

#[sealed_test]
fn body_change_inserts_updated_after_date() -> Result<()> {
    let fixture = fixture()?;
    fixture.write_and_commit("content/post.md", POST)?;
    fixture.write_and_stage("content/post.md", body_edit(POST))?;
    fixture.set_modified("content/post.md", (2024, 3, 5))?;

    let report = run_gate(&fixture, &Toolbox::empty())?;

    let expect = indoc! {r#"
        +++
        title = "Post"
        date = "2024-01-01"
        updated = "2024-03-05"
        +++

        First paragraph, revised.
    "#};
    assert_eq!(fixture.read("content/post.md")?, expect);
    assert_eq!(
        fixture.staged("content/post.md")?,
        Some(expect.as_bytes().to_vec())
    );
    assert_eq!(report.restaged, vec![PathBuf::from("content/post.md")]);

    Ok(())
}

#[sealed_test]
fn body_change_replaces_existing_updated() -> Result<()> {
    let post = indoc! {r#"
        +++
        title = "Post"
        date = 2024-01-01
        updated = 2024-02-01
        description = "About things"
        +++

        First paragraph.
    "#};
    let fixture = fixture()?;
    fixture.write_and_commit("content/post.md", post)?;
    fixture.write_and_stage("content/post.md", body_edit(post))?;
    fixture.set_modified("content/post.md", (2024, 3, 5))?;

    run_gate(&fixture, &Toolbox::empty())?;

    let expect = indoc! {r#"
        +++
        title = "Post"
        date = 2024-01-01
        updated = 2024-03-05
        description = "About things"
        +++

        First paragraph, revised.
    "#};
    assert_eq!(fixture.read("content/post.md")?, expect);

    Ok(())
}

#[sealed_test]
fn front_matter_only_edit_leaves_updated_alone() -> Result<()> {
    let fixture = fixture()?;
    fixture.write_and_commit("content/post.md", POST)?;
    let edited = POST.replace("title = \"Post\"", "title = \"Renamed post\"");
    fixture.write_and_stage("content/post.md", &edited)?;
    fixture.set_modified("content/post.md", (2024, 3, 5))?;

    let report = run_gate(&fixture, &Toolbox::empty())?;

    assert_eq!(fixture.read("content/post.md")?, edited);
    assert!(report.restaged.is_empty());

    Ok(())
}

#[sealed_test]
fn edit_on_creation_date_leaves_updated_alone() -> Result<()> {
    let fixture = fixture()?;
    fixture.write_and_commit("content/post.md", POST)?;
    fixture.write_and_stage("content/post.md", body_edit(POST))?;
    fixture.set_modified("content/post.md", (2024, 1, 1))?;

    run_gate(&fixture, &Toolbox::empty())?;

    assert_eq!(fixture.read("content/post.md")?, body_edit(POST));

    Ok(())
}

#[sealed_test]
fn index_pages_are_not_dated() -> Result<()> {
    let fixture = fixture()?;
    fixture.write_and_commit("content/blog/_index.md", POST)?;
    fixture.write_and_stage("content/blog/_index.md", body_edit(POST))?;
    fixture.set_modified("content/blog/_index.md", (2024, 3, 5))?;

    run_gate(&fixture, &Toolbox::empty())?;

    assert_eq!(fixture.read("content/blog/_index.md")?, body_edit(POST));

    Ok(())
}

#[sealed_test]
fn draft_is_rejected() -> Result<()> {
    let fixture = fixture()?;
    fixture.write_and_stage(
        "content/wip.md",
        "+++\ntitle = \"WIP\"\ndate = 2024-01-01\ndraft = true\n+++\nBody\n",
    )?;

    let result = run_gate(&fixture, &Toolbox::empty());
    assert!(matches!(
        result,
        Err(GateError::Check(CheckError::DraftCommitted { .. }))
    ));

    Ok(())
}

#[sealed_test]
fn draft_flag_on_tracked_post_is_rejected() -> Result<()> {
    let fixture = fixture()?;
    fixture.write_and_commit("content/post.md", POST)?;
    let drafted = POST.replace("date = \"2024-01-01\"\n", "date = \"2024-01-01\"\ndraft = true\n");
    fixture.write_and_stage("content/post.md", &drafted)?;

    let result = run_gate(&fixture, &Toolbox::empty());
    match result {
        Err(GateError::Check(CheckError::DraftCommitted { path })) => {
            assert_eq!(path, PathBuf::from("content/post.md"));
        }
        other => panic!("expected draft rejection, got {other:?}"),
    }
    assert_eq!(fixture.read("content/post.md")?, drafted);

    Ok(())
}

#[sealed_test]
fn updated_goes_after_first_date() -> Result<()> {
    let post = indoc! {r#"
        +++
        date = 2024-01-01
        title = "Post"
        date = 2023-06-01
        +++

        First paragraph.
    "#};
    let fixture = fixture()?;
    fixture.write_and_commit("content/post.md", post)?;
    fixture.write_and_stage("content/post.md", body_edit(post))?;
    fixture.set_modified("content/post.md", (2024, 3, 5))?;

    run_gate(&fixture, &Toolbox::empty())?;

    let expect = indoc! {r#"
        +++
        date = 2024-01-01
        updated = 2024-03-05
        title = "Post"
        date = 2023-06-01
        +++

        First paragraph, revised.
    "#};
    assert_eq!(fixture.read("content/post.md")?, expect);

    Ok(())
}

#[sealed_test]
fn forbidden_marker_is_rejected() -> Result<()> {
    let fixture = fixture()?;
    fixture.write_and_stage("templates/page.html", "<!-- TODO: footer -->\n")?;

    let result = run_gate(&fixture, &Toolbox::empty());
    match result {
        Err(GateError::Check(CheckError::ForbiddenMarker { path, marker })) => {
            assert_eq!(path, PathBuf::from("templates/page.html"));
            assert_eq!(marker, "TODO");
        }
        other => panic!("expected forbidden marker, got {other:?}"),
    }

    Ok(())
}

#[sealed_test]
fn changelog_is_exempt() -> Result<()> {
    let fixture = fixture()?;
    fixture.write_and_stage("CHANGELOG.md", "## Unreleased\n\n- TODO list support\n")?;

    run_gate(&fixture, &Toolbox::empty())?;

    Ok(())
}

#[sealed_test]
fn script_needs_minified_sibling() -> Result<()> {
    let fixture = fixture()?;
    fixture.write_and_stage("static/js/main.js", "function main() { return 1; }\n")?;

    let result = run_gate(&fixture, &Toolbox::empty());
    match result {
        Err(GateError::Check(CheckError::MissingMinified { expected, .. })) => {
            assert_eq!(expected, PathBuf::from("static/js/main.min.js"));
        }
        other => panic!("expected missing minified script, got {other:?}"),
    }

    fixture.write_and_stage("static/js/main.min.js", "function main(){return 1}")?;
    run_gate(&fixture, &Toolbox::empty())?;

    Ok(())
}

#[sealed_test]
fn minified_script_must_beat_minifiers() -> Result<()> {
    let fixture = fixture()?;
    fixture.write_and_stage("static/js/main.js", "x".repeat(100))?;
    fixture.write_and_stage("static/js/main.min.js", "x".repeat(50))?;

    let tools = Toolbox {
        minifiers: vec![
            Capability::Available(Box::new(FixedMinifier {
                name: "uglifyjs",
                size: 60,
            })),
            Capability::Available(Box::new(FixedMinifier {
                name: "terser",
                size: 40,
            })),
        ],
        ..Toolbox::empty()
    };
    let result = run_gate(&fixture, &tools);
    match result {
        Err(GateError::Check(CheckError::UnderOptimized {
            tool,
            committed,
            best,
            ..
        })) => {
            assert_eq!(tool, "terser");
            assert_eq!(committed, 50);
            assert_eq!(best, 40);
        }
        other => panic!("expected under-optimized script, got {other:?}"),
    }

    Ok(())
}

#[sealed_test]
fn minification_check_passes_without_minifiers() -> Result<()> {
    let fixture = fixture()?;
    fixture.write_and_stage("static/js/main.js", "x".repeat(100))?;
    fixture.write_and_stage("static/js/main.min.js", "x".repeat(100))?;

    let tools = Toolbox {
        minifiers: vec![Capability::unavailable("uglifyjs"), Capability::unavailable("terser")],
        ..Toolbox::empty()
    };
    run_gate(&fixture, &tools)?;

    Ok(())
}

#[sealed_test]
fn paired_config_sections_must_match() -> Result<()> {
    let fixture = fixture()?;
    fixture.write_and_stage("config.toml", SITE_CONFIG)?;
    fixture.write_and_stage("theme.toml", SITE_CONFIG)?;
    fixture.commit("chore: add configs")?;

    let grown = format!("{SITE_CONFIG}footer = true\n");
    fixture.write_and_stage("config.toml", &grown)?;
    let result = run_gate(&fixture, &Toolbox::empty());
    match result {
        Err(GateError::Check(CheckError::SectionMismatch {
            left_lines,
            right_lines,
            ..
        })) => {
            assert_eq!(left_lines, 3);
            assert_eq!(right_lines, 2);
        }
        other => panic!("expected section mismatch, got {other:?}"),
    }

    fixture.write_and_stage("theme.toml", &grown)?;
    run_gate(&fixture, &Toolbox::empty())?;

    Ok(())
}

#[sealed_test]
fn png_is_compressed_and_restaged() -> Result<()> {
    let fixture = fixture()?;
    let original = b"\x89PNG\r\n\x1a\nlots of image data".to_vec();
    fixture.write_and_stage("static/img/logo.png", &original)?;

    let tools = Toolbox {
        compressor: Capability::Available(Box::new(TruncatingCompressor { keep: 8 })),
        ..Toolbox::empty()
    };
    let report = run_gate(&fixture, &tools)?;

    let staged = fixture.staged("static/img/logo.png")?.unwrap_or_default();
    assert_eq!(staged, original[..8].to_vec());
    assert!(staged.len() <= original.len());
    assert_eq!(report.restaged, vec![PathBuf::from("static/img/logo.png")]);

    Ok(())
}

#[sealed_test]
fn failed_run_restores_compressed_image() -> Result<()> {
    let fixture = fixture()?;
    let original = b"\x89PNG\r\n\x1a\nlots of image data".to_vec();
    fixture.write_and_stage("a.png", &original)?;
    fixture.write_and_stage("b.txt", "TODO: describe image\n")?;

    let tools = Toolbox {
        compressor: Capability::Available(Box::new(TruncatingCompressor { keep: 8 })),
        ..Toolbox::empty()
    };
    let result = run_gate(&fixture, &tools);
    assert!(matches!(
        result,
        Err(GateError::Check(CheckError::ForbiddenMarker { .. }))
    ));

    assert_eq!(fs::read(fixture.root().join("a.png"))?, original);
    assert_eq!(fixture.staged("a.png")?, Some(original));

    Ok(())
}

#[sealed_test]
fn failed_run_restores_front_matter() -> Result<()> {
    let fixture = fixture()?;
    fixture.write_and_commit("content/post.md", POST)?;
    fixture.write_and_stage("content/post.md", body_edit(POST))?;
    fixture.set_modified("content/post.md", (2024, 3, 5))?;

    let tools = Toolbox {
        card_generator: Capability::Available(Box::new(StubCardGenerator { fail: true })),
        ..Toolbox::empty()
    };
    let result = run_gate(&fixture, &tools);
    assert!(matches!(result, Err(GateError::Tool(_))));

    assert_eq!(fixture.read("content/post.md")?, body_edit(POST));
    assert_eq!(
        fixture.staged("content/post.md")?,
        Some(body_edit(POST).into_bytes())
    );

    Ok(())
}

#[sealed_test]
fn new_content_gets_social_card() -> Result<()> {
    let fixture = fixture()?;
    fixture.write_and_stage("content/post.md", POST)?;

    let tools = Toolbox {
        card_generator: Capability::Available(Box::new(StubCardGenerator { fail: false })),
        ..Toolbox::empty()
    };
    let report = run_gate(&fixture, &tools)?;

    assert_eq!(
        report.restaged,
        vec![
            PathBuf::from("content/post.jpg"),
            PathBuf::from("content/post.md"),
        ]
    );
    assert_eq!(fixture.staged("content/post.jpg")?, Some(b"card".to_vec()));

    Ok(())
}

#[sealed_test]
fn site_config_change_regenerates_font_subset() -> Result<()> {
    let fixture = fixture()?;
    fixture.write_and_stage("config.toml", SITE_CONFIG)?;

    let tools = Toolbox {
        font_subsetter: Capability::Available(Box::new(StubFontSubsetter { fail: false })),
        ..Toolbox::empty()
    };
    let report = run_gate(&fixture, &tools)?;

    assert_eq!(
        report.restaged,
        vec![PathBuf::from("static/custom_subset.css")]
    );
    assert!(fixture.staged("static/custom_subset.css")?.is_some());

    Ok(())
}

#[sealed_test]
fn missing_font_subsetter_is_not_fatal() -> Result<()> {
    let fixture = fixture()?;
    fixture.write_and_stage("config.toml", SITE_CONFIG)?;

    let report = run_gate(&fixture, &Toolbox::empty())?;
    assert!(report.restaged.is_empty());
    assert_eq!(report.checked, 1);

    Ok(())
}

#[sealed_test]
fn paired_config_without_section_is_rejected() -> Result<()> {
    let fixture = fixture()?;
    fixture.write_and_stage("config.toml", SITE_CONFIG)?;
    fixture.write_and_stage("theme.toml", "name = \"theme\"\n")?;

    let result = run_gate(&fixture, &Toolbox::empty());
    match result {
        Err(GateError::Check(CheckError::MissingSection { path, section })) => {
            assert_eq!(path, PathBuf::from("theme.toml"));
            assert_eq!(section, "[extra]");
        }
        other => panic!("expected missing section, got {other:?}"),
    }

    Ok(())
}

#[sealed_test]
fn absent_paired_config_is_left_out() -> Result<()> {
    let fixture = fixture()?;
    fixture.write_and_stage("theme.toml", format!("{SITE_CONFIG}footer = true\n"))?;

    let report = run_gate(&fixture, &Toolbox::empty())?;
    assert_eq!(report.checked, 1);

    Ok(())
}

#[sealed_test]
fn failed_run_restores_files_edited_by_card_generator() -> Result<()> {
    let fixture = fixture()?;
    fixture.write_and_stage("content/a.md", POST)?;
    fixture.write_and_stage("content/b.md", POST)?;

    let tools = Toolbox {
        card_generator: Capability::Available(Box::new(EditingCardGenerator {
            fail_on: "content/b.md",
        })),
        ..Toolbox::empty()
    };
    let result = run_gate(&fixture, &tools);
    assert!(matches!(result, Err(GateError::Tool(_))));

    assert_eq!(fixture.read("content/a.md")?, POST);
    assert_eq!(fixture.read("content/b.md")?, POST);
    assert_eq!(fixture.staged("content/a.md")?, Some(POST.as_bytes().to_vec()));

    Ok(())
}

#[sealed_test]
fn card_generator_edits_are_restaged() -> Result<()> {
    let fixture = fixture()?;
    fixture.write_and_stage("content/a.md", POST)?;

    let tools = Toolbox {
        card_generator: Capability::Available(Box::new(EditingCardGenerator {
            fail_on: "content/none.md",
        })),
        ..Toolbox::empty()
    };
    run_gate(&fixture, &tools)?;

    let edited = fixture.read("content/a.md")?;
    assert!(edited.contains("social_media_card = \"content/a.jpg\""));
    assert_eq!(fixture.staged("content/a.md")?, Some(edited.into_bytes()));

    Ok(())
}

#[sealed_test]
fn failed_run_restores_tracked_font_subset() -> Result<()> {
    let fixture = fixture()?;
    fixture.write_and_commit("static/custom_subset.css", "/* old subset */\n")?;
    fixture.write_and_stage("config.toml", SITE_CONFIG)?;

    let tools = Toolbox {
        font_subsetter: Capability::Available(Box::new(StubFontSubsetter { fail: true })),
        ..Toolbox::empty()
    };
    let result = run_gate(&fixture, &tools);
    assert!(matches!(result, Err(GateError::Tool(_))));

    assert_eq!(
        fixture.read("static/custom_subset.css")?,
        "/* old subset */\n"
    );

    Ok(())
}
