// src/builder/html.rs

//! `<!-- build:<name> -->` block replacement for built HTML.

use std::sync::LazyLock;

use anyhow::anyhow;
use regex::{Captures, Regex};

use crate::errors::Result;

const BUILD_BLOCK: &str =
    r"(?s)(?m:^([ \t]*))?<!--\s*build:(\w+)\s*-->.*?<!--\s*endbuild\s*-->";

static BUILD_BLOCK_RE: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(BUILD_BLOCK));

/// Replace every `build:js` block with a script tag loading `script_src`,
/// keeping the block's indentation. Blocks with any other name are removed.
pub fn rewrite_build_blocks(html: &str, script_src: &str) -> Result<String> {
    let re = BUILD_BLOCK_RE
        .as_ref()
        .map_err(|e| anyhow!("compiling build block pattern: {e}"))?;

    let out = re.replace_all(html, |caps: &Captures<'_>| {
        let indent = caps.get(1).map_or("", |m| m.as_str());
        match &caps[2] {
            "js" => format!("{indent}<script src=\"{script_src}\"></script>"),
            _ => String::new(),
        }
    });
    Ok(out.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_block_becomes_script_tag() {
        let html = "<body>\n    <!-- build:js -->\n    <script src=\"src/build.js\"></script>\n    <!-- endbuild -->\n</body>\n";
        let out = rewrite_build_blocks(html, "build/build.min.js").unwrap();
        assert_eq!(
            out,
            "<body>\n    <script src=\"build/build.min.js\"></script>\n</body>\n"
        );
    }

    #[test]
    fn unassigned_blocks_are_removed() {
        let html = "<head>\n<!-- build:css -->\n<link href=\"a.css\">\n<!-- endbuild -->\n</head>";
        let out = rewrite_build_blocks(html, "build/x.js").unwrap();
        assert_eq!(out, "<head>\n\n</head>");
    }

    #[test]
    fn html_without_blocks_is_untouched() {
        let html = "<p>plain</p>";
        assert_eq!(rewrite_build_blocks(html, "build/x.js").unwrap(), html);
    }

    #[test]
    fn several_blocks_are_each_replaced() {
        let html = "<!-- build:js -->a<!-- endbuild -->|<!-- build:js -->b<!-- endbuild -->";
        let out = rewrite_build_blocks(html, "m.js").unwrap();
        assert_eq!(out, "<script src=\"m.js\"></script>|<script src=\"m.js\"></script>");
    }

    #[test]
    fn block_pattern_is_compiled_once_and_valid() {
        let first = BUILD_BLOCK_RE.as_ref().unwrap();
        rewrite_build_blocks("<!-- build:js --><!-- endbuild -->", "a.js").unwrap();
        assert!(std::ptr::eq(first, BUILD_BLOCK_RE.as_ref().unwrap()));
    }
}
