//! Project-wide constants.

/// File name of a declaration file. Evaluating one yields the raw rules
/// declared for the package rooted at its directory.
pub const DECL_FILE_NAME: &str = "RULES.lua";

/// Extensions whose modify-events never affect rule declarations.
///
/// A modification to one of these files cannot change the set of declared
/// rules, so the parse cache survives it. Creation and deletion still
/// invalidate (declarations may glob over source trees). Everything else
/// defaults to invalidation.
pub const DEFAULT_IGNORED_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "h", "hpp", "o", "a", "so", "s"];
