//! The patch engine — localized fragment replacement.
//!
//! Models are asked to emit an exact "old" fragment and its replacement
//! rather than a line-numbered diff; exact-substring edits of small regions
//! are far more reliable for LLM output. The cost is that the old fragment
//! must match the script byte-for-byte, so failure is an expected outcome
//! and surfaces as a typed, recoverable error.

use cadscribe_core::error::PatchError;

/// Replace the first (leftmost) occurrence of `old_fragment` in `original`
/// with `new_fragment`.
///
/// Pure and deterministic: everything outside the replaced region is
/// preserved verbatim, including whitespace. Fails without producing a
/// partial result when the fragment is absent or empty.
pub fn apply_patch(
    original: &str,
    old_fragment: &str,
    new_fragment: &str,
) -> Result<String, PatchError> {
    if old_fragment.is_empty() {
        return Err(PatchError::EmptyFragment);
    }

    let start = original
        .find(old_fragment)
        .ok_or_else(|| PatchError::FragmentNotFound {
            fragment: old_fragment.to_string(),
        })?;

    let mut patched =
        String::with_capacity(original.len() - old_fragment.len() + new_fragment.len());
    patched.push_str(&original[..start]);
    patched.push_str(new_fragment);
    patched.push_str(&original[start + old_fragment.len()..]);
    Ok(patched)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_only_first_occurrence() {
        let result = apply_patch("X A X A X", "A", "B").unwrap();
        assert_eq!(result, "X B X A X");
    }

    #[test]
    fn preserves_surrounding_text_verbatim() {
        let script = "let r = 4;\n\nlet body = cylinder({ radius: r });\n";
        let result = apply_patch(script, "let r = 4;", "let r = 6;").unwrap();
        assert_eq!(result, "let r = 6;\n\nlet body = cylinder({ radius: r });\n");
    }

    #[test]
    fn missing_fragment_is_a_typed_error() {
        let err = apply_patch("hello world", "goodbye", "hi").unwrap_err();
        assert_eq!(
            err,
            PatchError::FragmentNotFound {
                fragment: "goodbye".into()
            }
        );
    }

    #[test]
    fn empty_fragment_rejected() {
        assert_eq!(
            apply_patch("hello", "", "x").unwrap_err(),
            PatchError::EmptyFragment
        );
    }

    #[test]
    fn reverse_application_restores_original() {
        let original = "cube({ size: 10 });";
        let patched = apply_patch(original, "size: 10", "size: 20").unwrap();
        let restored = apply_patch(&patched, "size: 20", "size: 10").unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn multiline_fragment_with_exact_whitespace() {
        let script = "fn main() {\n    let a = 1;\n    let b = 2;\n}\n";
        let result = apply_patch(script, "    let a = 1;\n    let b = 2;", "    let a = 3;")
            .unwrap();
        assert_eq!(result, "fn main() {\n    let a = 3;\n}\n");
    }

    #[test]
    fn whole_string_replacement() {
        assert_eq!(apply_patch("abc", "abc", "xyz").unwrap(), "xyz");
    }

    #[test]
    fn replacement_may_be_empty() {
        assert_eq!(apply_patch("a b c", " b", "").unwrap(), "a c");
    }
}
