// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Suggestions for implementing undefined steps.

use lazy_regex::regex;

/// Suggests a regex pattern matching the given undefined step `text`, with
/// quoted strings and numbers turned into capture groups.
#[must_use]
pub fn suggest(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len());
    let mut last = 0;
    for m in regex!(r#""[^"]*"|-?\d+(?:\.\d+)?"#).find_iter(text) {
        pattern.push_str(&regex::escape(&text[last..m.start()]));
        pattern.push_str(if m.as_str().starts_with('"') {
            r#""([^"]*)""#
        } else {
            r"(-?\d+(?:\.\d+)?)"
        });
        last = m.end();
    }
    pattern.push_str(&regex::escape(&text[last..]));
    pattern
}

/// Renders a registration call stub for the given undefined step.
#[must_use]
pub fn render(keyword: &str, text: &str) -> String {
    let method = match keyword.trim().to_lowercase().as_str() {
        "given" => "given",
        "when" => "when",
        "then" => "then",
        _ => "step",
    };
    format!(
        ".{method}({}, |world, ctx| async move {{\n    \
             Err(pickler::Failure::pending())\n\
         }}.boxed_local())",
        raw_string(&suggest(text)),
    )
}

/// Quotes `s` as a raw string literal with enough `#`s to hold it.
fn raw_string(s: &str) -> String {
    let hashes = s
        .split('"')
        .skip(1)
        .map(|rest| rest.len() - rest.trim_start_matches('#').len())
        .max()
        .unwrap_or(0)
        + 1;
    let hashes = "#".repeat(hashes);
    format!("r{hashes}\"{s}\"{hashes}")
}

#[cfg(test)]
mod tests {
    use super::{raw_string, render, suggest};
    use crate::step::Pattern;

    #[test]
    fn replaces_numbers_and_strings() {
        assert_eq!(
            suggest(r#"I eat 5 "fresh" cucumbers"#),
            r#"I eat (-?\d+(?:\.\d+)?) "([^"]*)" cucumbers"#,
        );
        assert_eq!(suggest("a price of 2.5"), r"a price of (-?\d+(?:\.\d+)?)");
        assert_eq!(suggest("x -3"), r"x (-?\d+(?:\.\d+)?)");
    }

    #[test]
    fn escapes_regex_metacharacters() {
        assert_eq!(suggest("what? (really)"), r"what\? \(really\)");
    }

    #[test]
    fn suggestions_match_their_text() {
        for text in [
            r#"I eat 5 "fresh" cucumbers"#,
            "what? (really) 1.5",
            "x -3",
            "from -3 to -1.5 (-2)",
        ] {
            let compiled = Pattern::regex(suggest(text)).compile().unwrap();
            assert!(compiled.regex.is_match(text), "`{text}`");
        }
    }

    #[test]
    fn renders_stub_by_keyword() {
        assert!(render("Given ", "a fridge").starts_with(".given(r#\"a fridge\"#"));
        assert!(render("And ", "a fridge").starts_with(".step("));
    }

    #[test]
    fn raw_strings_outnumber_inner_hashes() {
        assert_eq!(raw_string("a fridge"), r##"r#"a fridge"#"##);
        assert_eq!(raw_string(r##"tag "#1""##), r###"r##"tag "#1""##"###);
        assert_eq!(raw_string(r###"a "## b "#"###), r####"r###"a "## b "#"###"####);
    }
}
