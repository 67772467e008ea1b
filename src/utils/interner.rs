//! Global string interner.
//!
//! Define names and values are interned once and compared as integer
//! [`Symbol`]s afterwards. Symbol ids depend on interning order, so they are
//! only stable within one process; anything persisted must use the resolved
//! strings.

use std::sync::LazyLock;

use lasso::{Spur, ThreadedRodeo};

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::new);

/// Compact integer handle for an interned string.
pub type Symbol = Spur;

/// Interns `s`, returning the existing symbol if it was seen before.
#[inline]
pub fn intern(s: &str) -> Symbol {
    INTERNER.get_or_intern(s)
}

/// Returns the symbol for `s` without interning it.
#[inline]
pub fn get(s: &str) -> Option<Symbol> {
    INTERNER.get(s)
}

#[inline]
pub fn resolve(sym: Symbol) -> &'static str {
    INTERNER.resolve(&sym)
}

/// Interns the stage and family defines so the compile path rarely has to
/// take the interner's write side.
pub fn preload_shader_defines() {
    let common = [
        "VSHADER",
        "PSHADER",
        "CSHADER",
        "DEFERRED",
        "TRUE_PBR",
        "GLINT",
        "WATER",
        "FOG",
        "SPECULAR",
        "NUM_SPECULAR_LIGHTS",
        "RENDER_DEPTH",
        "DO_ALPHA_TEST",
        "",
    ];

    for name in common {
        intern(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_and_resolve() {
        let s1 = intern("VSHADER");
        let s2 = intern("VSHADER");
        let s3 = intern("PSHADER");

        assert_eq!(s1, s2);
        assert_ne!(s1, s3);
        assert_eq!(resolve(s3), "PSHADER");
    }

    #[test]
    fn get_does_not_intern() {
        let _ = intern("WADING");

        assert!(get("WADING").is_some());
        assert!(get("never_interned_define").is_none());
    }
}
