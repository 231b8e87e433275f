use gadget_protocol::Language;
use once_cell::sync::Lazy;
use regex::Regex;

/// `function name(` / `function &name(`, anywhere on the line.
static PHP_SIGNATURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bfunction\s+&?\s*([\p{L}_][\w]*)\s*\(").expect("valid regex")
});

/// Annotations, modifiers, type parameters, return type, name, `(`; anchored
/// at line start. Groups: 1 = modifiers, 2 = return type, 3 = name.
static JAVA_SIGNATURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^\s*(?:@[\w$.]+(?:\([^)]*\))?\s+)*",
        r"((?:(?:public|protected|private|static|final|abstract|synchronized|native|strictfp|default)\s+)*)",
        r"(?:<[^>]+>\s+)?",
        r"(?:([\w$.]+(?:<[^()]*?>)?(?:\[\])*)\s+)?",
        r"([A-Za-z_$][\w$]*)\s*\(",
    ))
    .expect("valid regex")
});

/// Words that can precede `ident(` without declaring a method.
const JAVA_NON_TYPES: &[&str] = &[
    "return", "new", "throw", "else", "case", "assert", "yield", "goto", "package", "import",
];

const JAVA_NON_NAMES: &[&str] = &[
    "if", "for", "while", "switch", "catch", "synchronized", "return", "new", "throw", "super",
    "this", "do", "try",
];

/// Name of the function declared on `line`, if the line looks like a
/// declaration for `language`.
pub fn signature_name(language: Language, line: &str) -> Option<&str> {
    match language {
        Language::Php => PHP_SIGNATURE
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str()),
        Language::Java => {
            let caps = JAVA_SIGNATURE.captures(line)?;
            let modifiers = caps.get(1).map_or("", |m| m.as_str()).trim();
            let return_type = caps.get(2).map(|m| m.as_str());
            let name = caps.get(3)?.as_str();

            if modifiers.is_empty() && return_type.is_none() {
                return None;
            }
            if return_type.is_some_and(|ty| JAVA_NON_TYPES.contains(&ty)) {
                return None;
            }
            if JAVA_NON_NAMES.contains(&name) {
                return None;
            }
            Some(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn php_signatures() {
        let php = |line| signature_name(Language::Php, line);
        assert_eq!(php("    public function __destruct()"), Some("__destruct"));
        assert_eq!(php("function &getRef($x) {"), Some("getRef"));
        assert_eq!(php("  static FUNCTION Build ( $a )"), Some("Build"));
        assert_eq!(php("$f = function ($x) {"), None);
        assert_eq!(php("// no function here"), None);
    }

    #[test]
    fn java_signatures() {
        let java = |line| signature_name(Language::Java, line);
        assert_eq!(java("    public void readObject(ObjectInputStream in) {"), Some("readObject"));
        assert_eq!(java("  private static <T> List<T> of(T... items)"), Some("of"));
        assert_eq!(java("  Map<String, Object> build(int x) {"), Some("build"));
        assert_eq!(java("  public Foo(int x) {"), Some("Foo"));
        assert_eq!(java("  @Override public String toString() {"), Some("toString"));
        assert_eq!(java("  byte[] bytes() {"), Some("bytes"));
    }

    #[test]
    fn java_statements_are_not_signatures() {
        let java = |line| signature_name(Language::Java, line);
        assert_eq!(java("        return foo(x);"), None);
        assert_eq!(java("        foo(x);"), None);
        assert_eq!(java("        if (x) {"), None);
        assert_eq!(java("        } else if (y) {"), None);
        assert_eq!(java("        else if (y) {"), None);
        assert_eq!(java("        synchronized (lock) {"), None);
        assert_eq!(java("        throw new IllegalStateException(msg);"), None);
        assert_eq!(java("        Object o = new Object();"), None);
    }
}
