//! In-place, formatting-preserving rewrite of plugin version tags
//!
//! Deliberately avoids a structural YAML round-trip: re-serializing the
//! document would reformat comments, key ordering and quoting style. A
//! line scanner locates the exact tag span inside the matching `package:`
//! line and substitutes only that span, so every other byte of the file
//! comes through unchanged. Plugin names and tags are treated as literal
//! text throughout.

use std::ops::Range;

use tracing::{debug, warn};

use crate::reference::prefix::TagPrefixes;
use crate::reference::types::{PluginDescriptor, PluginUpdate};
use crate::version::encoding::EncodedVersion;

/// YAML key introducing a plugin package reference
const PACKAGE_KEY: &str = "package:";

/// Rewrites plugin version tags inside raw configuration text.
pub struct ConfigRewriter {
    prefixes: TagPrefixes,
}

impl ConfigRewriter {
    pub fn new(prefixes: TagPrefixes) -> Self {
        Self { prefixes }
    }

    /// Re-derive the tag prefix currently used in the raw text for a plugin.
    ///
    /// The descriptor already carries a prefix, but the text is scanned
    /// again so rewrites tolerate drift between the structured and textual
    /// representations. When nothing matches, the first configured prefix
    /// is returned as a permissive fallback; the rewrite then finds no
    /// matching line and leaves the text unchanged.
    pub fn find_current_prefix(&self, text: &str, descriptor: &PluginDescriptor) -> &str {
        for prefix in self.prefixes.iter() {
            let old_tag = format!("{}{}", prefix, descriptor.current_version.encode());
            let matched = text
                .lines()
                .any(|line| find_tag_span(line, &descriptor.plugin_name, &old_tag).is_some());
            if matched {
                return prefix;
            }
        }
        self.prefixes.first()
    }

    /// Replace one plugin's old tag with a new tag, scoped to matching lines.
    ///
    /// No matching line is not an error: callers may batch-process plugins
    /// that are absent from this particular file, so the input is returned
    /// unchanged and the miss is only logged.
    pub fn rewrite_one(
        &self,
        text: &str,
        descriptor: &PluginDescriptor,
        new_version: &EncodedVersion,
    ) -> String {
        debug!(
            "updating config for plugin {} to version {}",
            descriptor.plugin_name,
            new_version.encode()
        );

        let prefix = self.find_current_prefix(text, descriptor);
        let old_tag = format!("{}{}", prefix, descriptor.current_version.encode());
        let new_tag = format!("{}{}", prefix, new_version.encode());

        let mut changed = false;
        let mut out = String::with_capacity(text.len());
        for line in text.split_inclusive('\n') {
            match find_tag_span(line, &descriptor.plugin_name, &old_tag) {
                Some(span) => {
                    out.push_str(&line[..span.start]);
                    out.push_str(&new_tag);
                    out.push_str(&line[span.end..]);
                    changed = true;
                }
                None => out.push_str(line),
            }
        }

        if changed {
            debug!(
                "updated config for {} from {} to {}",
                descriptor.plugin_name,
                descriptor.current_version.encode(),
                new_version.encode()
            );
        } else {
            warn!(
                "no match found for plugin {} with version {}",
                descriptor.plugin_name,
                descriptor.current_version.encode()
            );
        }

        out
    }

    /// Apply a batch of updates sequentially, each seeing the previous
    /// one's output. The list order is the defined behavior.
    pub fn rewrite_many(&self, text: &str, updates: &[PluginUpdate]) -> String {
        updates.iter().fold(text.to_string(), |current, update| {
            self.rewrite_one(&current, &update.descriptor, &update.new_version)
        })
    }
}

/// Locate the byte span of `old_tag` inside a `package:` line.
///
/// A line matches when the value of its `package:` field contains the
/// plugin name followed, later in the same whitespace-free token, by
/// `:<old_tag>!`. Returns the span of the tag itself.
fn find_tag_span(line: &str, plugin_name: &str, old_tag: &str) -> Option<Range<usize>> {
    let key_pos = line.find(PACKAGE_KEY)?;
    let after_key = key_pos + PACKAGE_KEY.len();
    let rest = &line[after_key..];

    // at least one whitespace character between the key and its value
    let trimmed = rest.trim_start();
    if trimmed.len() == rest.len() {
        return None;
    }
    let value_start = after_key + (rest.len() - trimmed.len());
    let value_len = trimmed
        .find(char::is_whitespace)
        .unwrap_or(trimmed.len());
    let value = &line[value_start..value_start + value_len];

    let name_pos = value.find(plugin_name)?;
    let marker = format!(":{old_tag}!");
    let marker_pos = value[name_pos + plugin_name.len()..].find(&marker)?;

    let tag_start = value_start + name_pos + plugin_name.len() + marker_pos + 1;
    Some(tag_start..tag_start + old_tag.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::encoding::EncodedVersion;

    const SAMPLE: &str = "\
global:
  dynamic:
    plugins:
      - disabled: false
        package: oci://ghcr.io/org/overlays/plugin-actions-backend:next__0.1.2!plugin-actions-backend
      - disabled: false
        package: oci://ghcr.io/org/overlays/plugin-catalog-tool:next__0.2.0!plugin-catalog-tool
";

    fn rewriter() -> ConfigRewriter {
        ConfigRewriter::new(TagPrefixes::new(vec![
            "next__".to_string(),
            "release__".to_string(),
        ]))
    }

    fn descriptor(plugin_name: &str, version: &str) -> PluginDescriptor {
        PluginDescriptor {
            package_name: format!("overlays/{plugin_name}"),
            plugin_name: plugin_name.to_string(),
            current_version: EncodedVersion::decode(version).unwrap(),
            tag_prefix: "next__".to_string(),
            disabled: false,
        }
    }

    fn version(text: &str) -> EncodedVersion {
        EncodedVersion::decode(text).unwrap()
    }

    #[test]
    fn rewrite_one_replaces_only_the_tag() {
        let updated = rewriter().rewrite_one(
            SAMPLE,
            &descriptor("plugin-actions-backend", "0.1.2"),
            &version("0.1.3"),
        );

        assert!(updated.contains("plugin-actions-backend:next__0.1.3!plugin-actions-backend"));
        assert!(!updated.contains("next__0.1.2"));
        // everything else is byte-identical
        assert_eq!(updated.replace("next__0.1.3", "next__0.1.2"), SAMPLE);
    }

    #[test]
    fn rewrite_one_leaves_other_plugins_untouched() {
        let text = SAMPLE.replace("next__0.2.0", "next__0.1.2");
        let updated = rewriter().rewrite_one(
            &text,
            &descriptor("plugin-actions-backend", "0.1.2"),
            &version("0.1.3"),
        );

        // same version number on a different plugin stays as-is
        assert!(updated.contains("plugin-catalog-tool:next__0.1.2!plugin-catalog-tool"));
        assert!(updated.contains("plugin-actions-backend:next__0.1.3!plugin-actions-backend"));
    }

    #[test]
    fn rewrite_one_without_match_returns_input_unchanged() {
        let updated = rewriter().rewrite_one(
            SAMPLE,
            &descriptor("nonexistent-plugin", "1.0.0"),
            &version("1.0.1"),
        );
        assert_eq!(updated, SAMPLE);
    }

    #[test]
    fn rewrite_one_with_same_version_is_byte_identical() {
        let updated = rewriter().rewrite_one(
            SAMPLE,
            &descriptor("plugin-actions-backend", "0.1.2"),
            &version("0.1.2"),
        );
        assert_eq!(updated, SAMPLE);
    }

    #[test]
    fn rewrite_one_handles_dual_versions() {
        let text = SAMPLE.replace("next__0.1.2", "next__0.1.2__1.0.0");
        let updated = rewriter().rewrite_one(
            &text,
            &descriptor("plugin-actions-backend", "0.1.2__1.0.0"),
            &version("0.1.3__1.1.0"),
        );
        assert!(updated.contains("plugin-actions-backend:next__0.1.3__1.1.0!plugin-actions-backend"));
        assert!(!updated.contains("0.1.2__1.0.0"));
    }

    #[test]
    fn find_current_prefix_re_derives_from_text_over_descriptor() {
        // the file drifted to the release channel while the descriptor
        // still claims next__
        let text = SAMPLE.replace("next__0.1.2", "release__0.1.2");
        let rewriter = rewriter();
        let descriptor = descriptor("plugin-actions-backend", "0.1.2");

        assert_eq!(rewriter.find_current_prefix(&text, &descriptor), "release__");

        let updated = rewriter.rewrite_one(&text, &descriptor, &version("0.1.3"));
        assert!(updated.contains("plugin-actions-backend:release__0.1.3!plugin-actions-backend"));
    }

    #[test]
    fn find_current_prefix_falls_back_to_first_configured() {
        let descriptor = descriptor("nonexistent-plugin", "9.9.9");
        assert_eq!(
            rewriter().find_current_prefix(SAMPLE, &descriptor),
            "next__"
        );
    }

    #[test]
    fn rewrite_preserves_comments_and_formatting() {
        let text = "\
# managed by the updater   \n\
global:\n\
  dynamic:\n\
    plugins:\n\
      -   disabled:  false   # trailing note\n\
          package: oci://ghcr.io/org/overlays/plugin-x:next__1.0.0!plugin-x\n";
        let updated =
            rewriter().rewrite_one(text, &descriptor("plugin-x", "1.0.0"), &version("1.1.0"));

        assert_eq!(updated.replace("next__1.1.0", "next__1.0.0"), text);
        assert!(updated.contains("# managed by the updater   "));
        assert!(updated.contains("-   disabled:  false   # trailing note"));
    }

    #[test]
    fn rewrite_many_applies_updates_sequentially() {
        let updates = vec![
            PluginUpdate {
                descriptor: descriptor("plugin-actions-backend", "0.1.2"),
                new_version: version("0.1.3"),
            },
            PluginUpdate {
                descriptor: descriptor("plugin-catalog-tool", "0.2.0"),
                new_version: version("0.2.1"),
            },
        ];
        let updated = rewriter().rewrite_many(SAMPLE, &updates);

        assert!(updated.contains("next__0.1.3"));
        assert!(updated.contains("next__0.2.1"));
        assert!(!updated.contains("next__0.1.2"));
        assert!(!updated.contains("next__0.2.0"));
    }

    #[test]
    fn rewrite_many_is_order_independent_for_disjoint_targets() {
        let mut updates = vec![
            PluginUpdate {
                descriptor: descriptor("plugin-actions-backend", "0.1.2"),
                new_version: version("0.1.3"),
            },
            PluginUpdate {
                descriptor: descriptor("plugin-catalog-tool", "0.2.0"),
                new_version: version("0.2.1"),
            },
        ];
        let forward = rewriter().rewrite_many(SAMPLE, &updates);
        updates.reverse();
        let backward = rewriter().rewrite_many(SAMPLE, &updates);

        assert_eq!(forward, backward);
    }

    #[test]
    fn lines_without_package_key_never_match() {
        let text = "notes: plugin-x:next__1.0.0!plugin-x\n";
        let updated =
            rewriter().rewrite_one(text, &descriptor("plugin-x", "1.0.0"), &version("2.0.0"));
        assert_eq!(updated, text);
    }

    #[test]
    fn missing_whitespace_after_key_never_matches() {
        let text = "        package:oci://ghcr.io/org/overlays/plugin-x:next__1.0.0!plugin-x\n";
        let updated =
            rewriter().rewrite_one(text, &descriptor("plugin-x", "1.0.0"), &version("2.0.0"));
        assert_eq!(updated, text);
    }
}
