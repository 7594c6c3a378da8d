//! `.sln` and `.csproj` / `.vbproj` extraction.
//!
//! Solution files are a custom text format; project files are MSBuild XML
//! read through quick-xml's serde support. Malformed files are reported by
//! the caller and never fail the phase.

use std::path::Path;

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ProjectFileError {
    #[error("invalid project XML: {0}")]
    InvalidXml(String),
}

/// One `Project(...)` entry from a solution file.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionProject {
    pub name: String,
    /// Repo-relative, forward-slash path to the project file.
    pub path: String,
    pub guid: String,
}

/// Everything extracted from one MSBuild project file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectInfo {
    pub root_namespace: Option<String>,
    pub assembly_name: Option<String>,
    pub target_frameworks: Vec<String>,
    /// Referenced project paths, resolved relative to the project directory.
    pub project_references: Vec<String>,
    /// (package, version) pairs.
    pub package_references: Vec<(String, String)>,
}

// Solution-folder project type; such entries have no project file.
const SOLUTION_FOLDER_GUID: &str = "2150E333-8FDC-42A3-9474-1A3956D46DE8";

/// Parse `Project("{type}") = "Name", "Path", "{guid}"` lines out of a
/// `.sln`. Solution folders are honoured (skipped).
pub fn parse_solution(content: &str) -> Vec<SolutionProject> {
    let mut projects = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if !trimmed.starts_with("Project(") {
            continue;
        }
        let quoted: Vec<&str> = trimmed.split('"').collect();
        // Project("{type-guid}") = "Name", "Path", "{guid}"
        if quoted.len() < 8 {
            continue;
        }
        let type_guid = quoted[1].trim_matches(['{', '}']);
        if type_guid.eq_ignore_ascii_case(SOLUTION_FOLDER_GUID) {
            continue;
        }
        let name = quoted[3].to_string();
        let path = quoted[5].replace('\\', "/");
        let guid = quoted[7].trim_matches(['{', '}']).to_string();
        if path.ends_with(".csproj") || path.ends_with(".vbproj") {
            projects.push(SolutionProject { name, path, guid });
        }
    }
    projects
}

#[derive(Debug, Deserialize)]
struct MsbuildProject {
    #[serde(rename = "PropertyGroup", default)]
    property_groups: Vec<PropertyGroup>,
    #[serde(rename = "ItemGroup", default)]
    item_groups: Vec<ItemGroup>,
}

#[derive(Debug, Deserialize, Default)]
struct PropertyGroup {
    #[serde(rename = "RootNamespace")]
    root_namespace: Option<String>,
    #[serde(rename = "AssemblyName")]
    assembly_name: Option<String>,
    #[serde(rename = "TargetFramework")]
    target_framework: Option<String>,
    #[serde(rename = "TargetFrameworks")]
    target_frameworks: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ItemGroup {
    #[serde(rename = "ProjectReference", default)]
    project_references: Vec<ProjectReferenceItem>,
    #[serde(rename = "PackageReference", default)]
    package_references: Vec<PackageReferenceItem>,
}

#[derive(Debug, Deserialize)]
struct ProjectReferenceItem {
    #[serde(rename = "@Include")]
    include: String,
}

#[derive(Debug, Deserialize)]
struct PackageReferenceItem {
    #[serde(rename = "@Include")]
    include: String,
    #[serde(rename = "@Version")]
    version: Option<String>,
    #[serde(rename = "Version")]
    version_element: Option<String>,
}

/// Parse a `.csproj` / `.vbproj`. `project_path` is the repo-relative path
/// of the project file, used to resolve ProjectReference targets.
pub fn parse_project(content: &str, project_path: &str) -> Result<ProjectInfo, ProjectFileError> {
    let parsed: MsbuildProject = quick_xml::de::from_str(content)
        .map_err(|e| ProjectFileError::InvalidXml(e.to_string()))?;

    let mut info = ProjectInfo::default();
    for group in &parsed.property_groups {
        if info.root_namespace.is_none() {
            info.root_namespace = group.root_namespace.clone();
        }
        if info.assembly_name.is_none() {
            info.assembly_name = group.assembly_name.clone();
        }
        if let Some(tf) = &group.target_framework {
            info.target_frameworks.push(tf.clone());
        }
        if let Some(tfs) = &group.target_frameworks {
            info.target_frameworks
                .extend(tfs.split(';').map(|s| s.trim().to_string()));
        }
    }

    let project_dir = Path::new(project_path).parent().unwrap_or(Path::new(""));
    for group in &parsed.item_groups {
        for reference in &group.project_references {
            let target = reference.include.replace('\\', "/");
            info.project_references
                .push(normalize_path(&project_dir.join(target)));
        }
        for package in &group.package_references {
            let version = package
                .version
                .clone()
                .or_else(|| package.version_element.clone())
                .unwrap_or_default();
            info.package_references.push((package.include.clone(), version));
        }
    }
    Ok(info)
}

/// Collapse `.` and `..` segments into a repo-relative forward-slash path.
pub fn normalize_path(path: &Path) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let normalized = path.to_string_lossy().replace('\\', "/");
    for part in normalized.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLN: &str = r#"
Microsoft Visual Studio Solution File, Format Version 12.00
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "Acme.Api", "src\Acme.Api\Acme.Api.csproj", "{11111111-2222-3333-4444-555555555555}"
EndProject
Project("{2150E333-8FDC-42A3-9474-1A3956D46DE8}") = "Solution Items", "Solution Items", "{99999999-8888-7777-6666-555555555555}"
EndProject
Project("{F184B08F-C81C-45F6-A57F-5ABD9991F28F}") = "Acme.Legacy", "src\Acme.Legacy\Acme.Legacy.vbproj", "{AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE}"
EndProject
"#;

    const CSPROJ: &str = r#"
<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <TargetFramework>net8.0</TargetFramework>
    <RootNamespace>Acme.Api</RootNamespace>
    <AssemblyName>Acme.Api</AssemblyName>
  </PropertyGroup>
  <ItemGroup>
    <ProjectReference Include="..\Acme.Core\Acme.Core.csproj" />
  </ItemGroup>
  <ItemGroup>
    <PackageReference Include="Serilog" Version="3.1.1" />
    <PackageReference Include="Dapper">
      <Version>2.1.0</Version>
    </PackageReference>
  </ItemGroup>
</Project>
"#;

    #[test]
    fn test_solution_parsing_honours_folders() {
        let projects = parse_solution(SLN);
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].name, "Acme.Api");
        assert_eq!(projects[0].path, "src/Acme.Api/Acme.Api.csproj");
        assert_eq!(projects[1].path, "src/Acme.Legacy/Acme.Legacy.vbproj");
    }

    #[test]
    fn test_project_properties() {
        let info = parse_project(CSPROJ, "src/Acme.Api/Acme.Api.csproj").unwrap();
        assert_eq!(info.root_namespace.as_deref(), Some("Acme.Api"));
        assert_eq!(info.assembly_name.as_deref(), Some("Acme.Api"));
        assert_eq!(info.target_frameworks, vec!["net8.0"]);
    }

    #[test]
    fn test_project_reference_resolved_against_project_dir() {
        let info = parse_project(CSPROJ, "src/Acme.Api/Acme.Api.csproj").unwrap();
        assert_eq!(info.project_references, vec!["src/Acme.Core/Acme.Core.csproj"]);
    }

    #[test]
    fn test_package_references_attribute_and_element_version() {
        let info = parse_project(CSPROJ, "src/Acme.Api/Acme.Api.csproj").unwrap();
        assert_eq!(
            info.package_references,
            vec![
                ("Serilog".to_string(), "3.1.1".to_string()),
                ("Dapper".to_string(), "2.1.0".to_string()),
            ]
        );
    }

    #[test]
    fn test_malformed_project_is_an_error() {
        assert!(parse_project("<Project><Unclosed>", "x.csproj").is_err());
    }

    #[test]
    fn test_multi_target_frameworks() {
        let xml = r#"
<Project>
  <PropertyGroup>
    <TargetFrameworks>net8.0;netstandard2.0</TargetFrameworks>
  </PropertyGroup>
</Project>
"#;
        let info = parse_project(xml, "a.csproj").unwrap();
        assert_eq!(info.target_frameworks, vec!["net8.0", "netstandard2.0"]);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("src/Acme.Api/../Acme.Core/Acme.Core.csproj")),
            "src/Acme.Core/Acme.Core.csproj"
        );
    }
}
