use libuidiff::artifact::annotated_file_name;
use libuidiff::{BatchSummary, ComparisonVerdict};

/// Image sources for one verdict section, relative to the report or absolute.
pub struct SectionImages {
    pub old_src: String,
    pub new_src: String,
    /// Present when an annotated image was written for the pair
    pub annotated_src: Option<String>,
}

impl SectionImages {
    pub fn new(old_src: String, new_src: String, verdict: &ComparisonVerdict, with_annotated: bool) -> Self {
        let annotated_src = (verdict.changed && with_annotated)
            .then(|| annotated_file_name(&verdict.filename));
        Self {
            old_src,
            new_src,
            annotated_src,
        }
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn header(title: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>

<head>
<title>{title}</title>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<style type="text/css">
body {{ font-family: sans-serif; margin: 2em; }}
h2 {{ margin-top: 3em; }}
.changed {{ color: #c00; }}
.unchanged {{ color: #080; }}
.sidebyside {{ display: flex; justify-content: space-around; gap: 1em; }}
.sidebyside > div {{ flex: 1; text-align: center; }}
.sidebyside img {{ max-width: 100%; border: 1px solid #ccc; }}
.narration {{ white-space: pre-wrap; background: #f5f5f5; padding: 1em; }}
</style>
</head>

<body>
<h1>{title}</h1>

"#,
        title = escape(title)
    )
}

pub fn summary(summary: &BatchSummary, unmatched: usize) -> String {
    let mut html = format!(
        "<p>{} pairs compared, {} changed, {} failed, {} unmatched files</p>\n",
        summary.processed(),
        summary.changed(),
        summary.failed(),
        unmatched
    );
    if summary.cancelled {
        html += &format!(
            "<p class=\"changed\">Run interrupted, {} pairs skipped</p>\n",
            summary.skipped
        );
    }
    if !summary.failures.is_empty() {
        html += "<ul>\n";
        for failure in &summary.failures {
            html += &format!(
                "\t<li><b>{}</b>: {}</li>\n",
                escape(&failure.filename),
                escape(&failure.error)
            );
        }
        html += "</ul>\n";
    }
    html
}

pub fn verdict_section(verdict: &ComparisonVerdict, images: &SectionImages) -> String {
    let (class, status) = if verdict.changed {
        ("changed", "CHANGED")
    } else {
        ("unchanged", "UNCHANGED")
    };

    let mut html = format!(
        r#"
<h2>{filename} <span class="{class}">{status}</span></h2>
<p>Image hash difference: {hash:.4} &middot; SSIM score: {ssim:.4}</p>
<div class="sidebyside">
<div><p>Old</p><img src="{old}" /></div>
<div><p>New</p><img src="{new}" /></div>
"#,
        filename = escape(&verdict.filename),
        class = class,
        status = status,
        hash = verdict.hash_distance,
        ssim = verdict.structural_score,
        old = escape(&images.old_src),
        new = escape(&images.new_src),
    );
    if let Some(annotated) = &images.annotated_src {
        html += &format!(
            "<div><p>Annotated</p><img src=\"{}\" /></div>\n",
            escape(annotated)
        );
    }
    html += "</div>\n";

    if !verdict.regions.is_empty() {
        html += "<ul>\n";
        for region in &verdict.regions {
            html += &format!(
                "\t<li>{} at ({}, {}) size {}x{}</li>\n",
                region.kind, region.x, region.y, region.width, region.height
            );
        }
        html += "</ul>\n";
    }
    if let Some(narration) = &verdict.narration {
        html += &format!("<div class=\"narration\">{}</div>\n", escape(narration));
    }
    html
}

pub fn footer() -> String {
    r#"

</body>
</html>
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use libuidiff::DiffRegion;

    fn verdict() -> ComparisonVerdict {
        ComparisonVerdict {
            filename: "login<1>.png".to_string(),
            changed: true,
            hash_distance: 0.25,
            structural_score: 0.97,
            regions: vec![DiffRegion::new(40, 300, 150, 20)],
            narration: Some("Button & label moved".to_string()),
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_section_contains_everything() {
        let v = verdict();
        let images = SectionImages::new("old/a.png".into(), "new/a.png".into(), &v, true);
        let html = verdict_section(&v, &images);
        assert!(html.contains("login&lt;1&gt;.png"));
        assert!(html.contains("CHANGED"));
        assert!(html.contains("diff_login&lt;1&gt;.png"));
        assert!(html.contains("Spacing change at (40, 300) size 150x20"));
        assert!(html.contains("Button &amp; label moved"));
    }

    #[test]
    fn test_unchanged_section_has_no_annotated_image() {
        let mut v = verdict();
        v.changed = false;
        v.regions.clear();
        v.narration = None;
        let images = SectionImages::new("o.png".into(), "n.png".into(), &v, true);
        assert!(images.annotated_src.is_none());
        let html = verdict_section(&v, &images);
        assert!(!html.contains("Annotated"));
        assert!(html.contains("UNCHANGED"));
    }
}
