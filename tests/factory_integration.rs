//! Integration tests for loading projects from disk.
//!
//! These tests run the analyzer against the fixture projects in testdata.

use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use tsgql::analyzer::write_output_files;
use tsgql::{AnalyzerFactory, ConfigError};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn simple_prj() -> PathBuf {
    testdata_path().join("simple-prj")
}

#[test]
fn test_create_from_project_directory() {
    let analyzer = AnalyzerFactory::new()
        .create_from_project_path(simple_prj())
        .expect("should load project");
    assert_eq!(analyzer.root(), simple_prj().as_path());
    assert!(analyzer.config().enabled_global_fragments);
}

#[test]
fn test_create_from_config_file() {
    let analyzer = AnalyzerFactory::new()
        .create_from_project_path(simple_prj().join("tsgql.yaml"))
        .expect("should load project");
    assert_eq!(analyzer.config().schema, "schema.graphql");
}

#[test]
fn test_not_existing_path() {
    let result = AnalyzerFactory::new().create_from_project_path("NOT_EXISTING_PRJ");
    assert!(matches!(result, Err(ConfigError::ProjectNotFound(_))));
}

#[test]
fn test_directory_without_config() {
    let result = AnalyzerFactory::new().create_from_project_path(testdata_path().join("no-config-prj"));
    assert!(matches!(result, Err(ConfigError::ConfigNotFound { .. })));
}

#[test]
fn test_invalid_config_format() {
    let result = AnalyzerFactory::new().create_from_project_path(simple_prj().join("invalid.yaml"));
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[test]
fn test_config_without_schema() {
    let result = AnalyzerFactory::new().create_from_project_path(simple_prj().join("no-schema.yaml"));
    assert!(matches!(result, Err(ConfigError::MissingSchema)));
}

#[test]
fn test_config_with_unknown_addon() {
    let result = AnalyzerFactory::new().create_from_project_path(simple_prj().join("invalid-addon.yaml"));
    match result {
        Err(ConfigError::UnknownAddon(name)) => assert_eq!(name, "no-such-addon"),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("expected an error"),
    }
}

#[tokio::test]
async fn test_validate_fixture_project() {
    let analyzer = AnalyzerFactory::new()
        .create_from_project_path(simple_prj())
        .expect("should load project");
    let result = analyzer.validate().await;

    assert!(result.errors.is_empty(), "{:?}", result.errors);
    let schema = result.schema.expect("schema");
    assert!(schema.get_object("User").unwrap().fields.contains_key("nickname"));
}

#[tokio::test]
async fn test_typegen_fixture_project() {
    let analyzer = AnalyzerFactory::new()
        .create_from_project_path(simple_prj())
        .expect("should load project");
    let result = analyzer.typegen().await;

    assert!(result.errors.is_empty(), "{:?}", result.errors);
    let names: Vec<&str> = result
        .output_source_files
        .iter()
        .map(|f| f.file_name.as_str())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names[0].ends_with("src/__generated__/get-user.ts"));
    assert!(names[1].ends_with("src/__generated__/user-fields.ts"));

    assert_eq!(
        result.output_source_files[0].content,
        r#"/* eslint-disable */
/* This is an autogenerated file. Do not edit this file directly! */
import type { TypedQueryDocumentNode } from "graphql";
export type GetUser = {
    user: {
        id: string;
        name: string;
        createdAt: string | null;
        nickname: string | null;
    } | null;
};
export type GetUserVariables = {
    id: string;
};
export type GetUserDocument = TypedQueryDocumentNode<GetUser, GetUserVariables>;
"#
    );
}

#[test]
fn test_extract_fixture_project() {
    let analyzer = AnalyzerFactory::new()
        .create_from_project_path(simple_prj())
        .expect("should load project");
    let (result, manifest) = analyzer.extract_to_manifest();

    assert!(result.pickup_errors().is_empty());
    let kinds: Vec<&str> = manifest.documents.iter().map(|d| d.kind.as_str()).collect();
    assert_eq!(kinds, vec!["query", "fragment"]);
    assert_eq!(manifest.documents[0].operation_name.as_deref(), Some("GetUser"));
    assert_eq!(manifest.documents[1].fragment_name.as_deref(), Some("UserFields"));
}

fn write_project(root: &Path) {
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(root.join("tsgql.yaml"), "schema: schema.graphql\ntag: gql\n").unwrap();
    fs::write(root.join("schema.graphql"), "type Query { hello: String! }\n").unwrap();
    fs::write(
        root.join("src/main.ts"),
        "const query = gql`query MyQuery { hello }`;\n",
    )
    .unwrap();
}

#[tokio::test]
async fn test_generated_files_are_written_and_skipped_on_rescan() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path());

    let analyzer = AnalyzerFactory::new()
        .create_from_project_path(temp.path())
        .expect("should load project");
    let result = analyzer.typegen().await;
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    write_output_files(&result.output_source_files).unwrap();

    let generated = temp.path().join("src/__generated__/my-query.ts");
    let content = fs::read_to_string(&generated).unwrap();
    assert!(content.contains("export type MyQuery = {\n    hello: string;\n};"));

    // Generated declarations are not sources themselves.
    let again = analyzer.typegen().await;
    assert_eq!(again.output_source_files.len(), 1);
}

#[tokio::test]
async fn test_empty_schema_file_means_no_schema() {
    let temp = TempDir::new().unwrap();
    write_project(temp.path());
    fs::write(temp.path().join("schema.graphql"), "  \n").unwrap();

    let analyzer = AnalyzerFactory::new()
        .create_from_project_path(temp.path())
        .expect("should load project");
    let result = analyzer.validate().await;
    assert_eq!(result.errors.len(), 1);
    assert!(result.schema.is_none());
}
