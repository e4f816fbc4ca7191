use serde::{Deserialize, Serialize};

/// Package manager driving install and build for a lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Toolchain {
    Npm,
    Pnpm,
}

impl Toolchain {
    pub fn program(self) -> &'static str {
        match self {
            Toolchain::Npm => "npm",
            Toolchain::Pnpm => "pnpm",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPass {
    /// Install + build at the project (or workspace) root.
    Root,
    /// Build scoped to the standalone CLI package.
    Standalone,
}

/// One subprocess invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStep {
    /// Relative to the extracted `<project>-<version>` directory; `.` for the root.
    pub working_dir: String,
    pub program: String,
    pub args: Vec<String>,
    pub pass: BuildPass,
}

impl BuildStep {
    pub fn command_line(&self) -> String {
        let mut s = self.program.clone();
        for a in &self.args {
            s.push(' ');
            s.push_str(a);
        }
        s
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStrategy {
    pub toolchain: Toolchain,
    pub steps: Vec<BuildStep>,
}

impl BuildStrategy {
    /// Working directories in first-use order, without duplicates.
    pub fn working_directories(&self) -> Vec<&str> {
        let mut dirs: Vec<&str> = Vec::new();
        for step in &self.steps {
            if !dirs.contains(&step.working_dir.as_str()) {
                dirs.push(step.working_dir.as_str());
            }
        }
        dirs
    }

    pub fn build_commands(&self) -> Vec<String> {
        self.steps.iter().map(BuildStep::command_line).collect()
    }

    pub fn has_standalone_pass(&self) -> bool {
        self.steps.iter().any(|s| s.pass == BuildPass::Standalone)
    }
}
