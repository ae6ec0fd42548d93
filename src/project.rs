use crate::model::{Language, ParsedFile};
use std::collections::BTreeSet;

/// Best guess at the framework a project is built on. Shown in reports only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectType {
    Django,
    Flask,
    FastApi,
    NextJs,
    NestJs,
    Angular,
    Vue,
    React,
    Express,
    Python,
    Node,
    Unknown,
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProjectType::Django => "Django",
            ProjectType::Flask => "Flask",
            ProjectType::FastApi => "FastAPI",
            ProjectType::NextJs => "Next.js",
            ProjectType::NestJs => "NestJS",
            ProjectType::Angular => "Angular",
            ProjectType::Vue => "Vue",
            ProjectType::React => "React",
            ProjectType::Express => "Express",
            ProjectType::Python => "Python",
            ProjectType::Node => "Node.js",
            ProjectType::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// Root package of an import specifier: `django.db` -> `django`,
/// `@nestjs/core` -> `@nestjs/core`, `next/router` -> `next`.
fn package_root(module_path: &str) -> &str {
    if module_path.starts_with('@') {
        let mut parts = module_path.splitn(3, '/');
        let scope = parts.next().unwrap_or_default();
        let name = parts.next().unwrap_or_default();
        return &module_path[..(scope.len() + 1 + name.len()).min(module_path.len())];
    }
    module_path
        .split(['.', '/'])
        .next()
        .unwrap_or(module_path)
}

pub fn detect_project_type(files: &[ParsedFile]) -> ProjectType {
    let mut packages: BTreeSet<&str> = BTreeSet::new();
    let mut python = 0usize;
    let mut node = 0usize;
    let mut has_manage_py = false;
    let mut has_next_pages = false;

    for file in files {
        match file.result.language {
            Language::Python => python += 1,
            Language::JavaScript | Language::TypeScript => node += 1,
        }
        let path = file.path().to_string_lossy().replace('\\', "/");
        if path == "manage.py" || path.ends_with("/manage.py") {
            has_manage_py = true;
        }
        if path.starts_with("pages/") || path.contains("/pages/_app.") || path.starts_with("app/layout.") {
            has_next_pages = true;
        }
        for import in &file.result.imports {
            if !import.is_relative {
                packages.insert(package_root(&import.module_path));
            }
        }
    }

    let uses = |name: &str| packages.contains(name);

    if python >= node && python > 0 {
        if uses("django") || has_manage_py {
            ProjectType::Django
        } else if uses("fastapi") {
            ProjectType::FastApi
        } else if uses("flask") {
            ProjectType::Flask
        } else {
            ProjectType::Python
        }
    } else if node > 0 {
        if uses("next") || (has_next_pages && uses("react")) {
            ProjectType::NextJs
        } else if uses("@nestjs/core") || uses("@nestjs/common") {
            ProjectType::NestJs
        } else if uses("@angular/core") {
            ProjectType::Angular
        } else if uses("vue") {
            ProjectType::Vue
        } else if uses("react") || uses("react-dom") {
            ProjectType::React
        } else if uses("express") {
            ProjectType::Express
        } else {
            ProjectType::Node
        }
    } else {
        ProjectType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceFile;
    use crate::parser::ParserRegistry;

    fn parse(path: &str, source: &str) -> ParsedFile {
        ParserRegistry::new().parse(&SourceFile::from_path(path, source).unwrap())
    }

    #[test]
    fn test_package_root() {
        assert_eq!(package_root("django.db.models"), "django");
        assert_eq!(package_root("@nestjs/core/injector"), "@nestjs/core");
        assert_eq!(package_root("next/router"), "next");
        assert_eq!(package_root("react"), "react");
    }

    #[test]
    fn test_detects_frameworks() {
        let django = vec![parse("app/models.py", "from django.db import models\n")];
        assert_eq!(detect_project_type(&django), ProjectType::Django);

        let fastapi = vec![parse("main.py", "from fastapi import FastAPI\n")];
        assert_eq!(detect_project_type(&fastapi), ProjectType::FastApi);

        let nest = vec![parse("src/app.module.ts", "import { Module } from '@nestjs/common';\n")];
        assert_eq!(detect_project_type(&nest), ProjectType::NestJs);

        let react = vec![parse("src/App.tsx", "import React from 'react';\n")];
        assert_eq!(detect_project_type(&react).to_string(), "React");
    }

    #[test]
    fn test_falls_back_to_language() {
        assert_eq!(
            detect_project_type(&[parse("tool.py", "import os\n")]),
            ProjectType::Python
        );
        assert_eq!(detect_project_type(&[]), ProjectType::Unknown);
    }
}
