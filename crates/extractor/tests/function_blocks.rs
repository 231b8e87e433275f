use gadget_extractor::{BlockExtractor, BlockKind, ExtractorError};
use gadget_protocol::Language;
use std::fs;
use tempfile::tempdir;

fn brace_counts(lines: &[String]) -> (usize, usize) {
    let text = lines.join("\n");
    (text.matches('{').count(), text.matches('}').count())
}

#[test]
fn balanced_php_body_has_equal_brace_counts() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("Gadget.php");
    fs::write(
        &path,
        r#"<?php
namespace App;

class Gadget
{
    private $handler;

    public function __toString()
    {
        $map = ['a' => function () { return 1; }];
        foreach ($map as $k => $v) {
            if ($k) {
                call_user_func($this->handler, $v);
            }
        }
        return '';
    }

    public function helper() { return 2; }
}
"#,
    )
    .unwrap();

    let extractor = BlockExtractor::default();
    for target in [8, 11, 13, 16] {
        let block = extractor
            .extract_file(&path, target, Language::Php)
            .expect("extract");
        assert_eq!(block.kind, BlockKind::Function);
        assert_eq!(block.function_name.as_deref(), Some("__toString"), "line {target}");
        assert_eq!((block.start_line, block.end_line), (8, 17));
        let (open, close) = brace_counts(&block.code_lines);
        assert_eq!(open, close);
        assert!(block.code_lines[0].contains("function __toString"));
    }
}

#[test]
fn balanced_java_body_has_equal_brace_counts() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("Handler.java");
    fs::write(
        &path,
        r#"package org.example;

import java.io.Serializable;

public class Handler implements Serializable {
    private transient Runnable task;

    @Override
    public int hashCode() {
        try {
            Runtime.getRuntime().exec(new String[] {"id"});
        } catch (Exception e) {
            throw new RuntimeException(e);
        }
        return 1;
    }
}
"#,
    )
    .unwrap();

    let block = BlockExtractor::default()
        .extract_file(&path, 11, Language::Java)
        .expect("extract");
    assert_eq!(block.function_name.as_deref(), Some("hashCode"));
    assert_eq!((block.start_line, block.end_line), (9, 16));
    let (open, close) = brace_counts(&block.code_lines);
    assert_eq!(open, close);
}

#[test]
fn empty_and_missing_files_are_errors() {
    let temp = tempdir().unwrap();
    let empty = temp.path().join("empty.php");
    fs::write(&empty, "").unwrap();

    let extractor = BlockExtractor::default();
    assert!(matches!(
        extractor.extract_file(&empty, 1, Language::Php),
        Err(ExtractorError::EmptyFile(_))
    ));
    assert!(matches!(
        extractor.extract_file(&temp.path().join("nope.php"), 1, Language::Php),
        Err(ExtractorError::IoError(_))
    ));
}

#[test]
fn invalid_utf8_is_tolerated() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("latin1.php");
    fs::write(&path, b"<?php\nfunction f() {\n  echo \"\xe9\";\n}\n").unwrap();
    let block = BlockExtractor::default()
        .extract_file(&path, 3, Language::Php)
        .expect("extract");
    assert_eq!((block.start_line, block.end_line), (2, 4));
}
