//! Per-day exercise bundle.
//!
//! Alongside the store record, each generation produces the files a solver
//! actually works in. They are pushed to a `challenge/<date>` branch by the
//! surrounding workflow and opened through the StackBlitz / CodeSandbox links
//! on the card.
//!
//! ```text
//! challenge-output/
//! ├── challenge.ts              # Exercise stubs (model output, verbatim)
//! ├── challenge.test.ts         # Test harness (model output, verbatim)
//! ├── README.md                 # Scenario, how to solve, checklist, bonus
//! ├── tsconfig.json             # strict, ES2022, bundler resolution
//! ├── package.json              # `npm test` = tsc --noEmit && tsx
//! └── .codesandbox/
//!     └── tasks.json            # Sandbox install + test tasks
//! ```
//!
//! The TypeScript files are opaque payload; nothing here inspects them.

use crate::blob::BlobStore;
use crate::generator::ChallengePayload;
use crate::types::Difficulty;
use serde_json::json;

/// Exercise material from one generation that does not go into the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseBundle {
    pub date: String,
    pub title: String,
    pub difficulty: Difficulty,
    pub scenario: String,
    pub challenge_source: String,
    pub test_source: String,
    pub evaluation_checklist: String,
    pub bonus: String,
}

/// One file of the bundle, keyed relative to the bundle directory.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleFile {
    pub name: &'static str,
    pub content: String,
}

impl ExerciseBundle {
    pub fn from_payload(payload: &ChallengePayload, date: &str) -> Self {
        Self {
            date: date.to_string(),
            title: payload.title.clone(),
            difficulty: payload.difficulty,
            scenario: payload.scenario.clone(),
            challenge_source: payload.challenge_source.clone(),
            test_source: payload.test_source.clone(),
            evaluation_checklist: payload.evaluation_checklist.clone(),
            bonus: payload.bonus.clone(),
        }
    }

    /// Every file of the bundle, in a stable order.
    pub fn files(&self) -> Vec<BundleFile> {
        vec![
            BundleFile {
                name: "challenge.ts",
                content: self.challenge_source.clone(),
            },
            BundleFile {
                name: "challenge.test.ts",
                content: self.test_source.clone(),
            },
            BundleFile {
                name: "README.md",
                content: self.readme(),
            },
            BundleFile {
                name: "tsconfig.json",
                content: pretty(&json!({
                    "compilerOptions": {
                        "strict": true,
                        "target": "ES2022",
                        "module": "ESNext",
                        "moduleResolution": "bundler",
                        "noEmit": true,
                        "skipLibCheck": true
                    },
                    "include": ["*.ts"]
                })),
            },
            BundleFile {
                name: "package.json",
                content: pretty(&json!({
                    "name": format!("ts-challenge-{}", self.date),
                    "private": true,
                    "type": "module",
                    "devDependencies": {
                        "typescript": "^5.7.0",
                        "tsx": "^4.19.0"
                    },
                    "scripts": {
                        "test": "tsc --noEmit && tsx challenge.test.ts"
                    }
                })),
            },
            BundleFile {
                name: ".codesandbox/tasks.json",
                content: pretty(&json!({
                    "setupTasks": [
                        { "name": "Install Dependencies", "command": "npm install" }
                    ],
                    "tasks": {
                        "type-check": {
                            "name": "Type Check",
                            "command": "npx tsc --noEmit",
                            "runAtStart": false
                        },
                        "run-tests": {
                            "name": "Run Tests",
                            "command": "npx tsx challenge.test.ts",
                            "runAtStart": false
                        },
                        "test": {
                            "name": "Type Check + Run Tests",
                            "command": "npm test",
                            "runAtStart": false
                        }
                    }
                })),
            },
        ]
    }

    fn readme(&self) -> String {
        let mut lines = vec![
            format!("# {}", self.title),
            String::new(),
            format!("**Difficulty:** {}", self.difficulty),
            String::new(),
            "## Scenario".to_string(),
            String::new(),
            self.scenario.clone(),
            String::new(),
            "## How to solve".to_string(),
            String::new(),
            "1. Open `challenge.ts`".to_string(),
            "2. Implement the types and functions marked with `TODO`".to_string(),
            "3. Verify your solution using one of the methods below".to_string(),
            String::new(),
            "### In CodeSandbox (recommended)".to_string(),
            String::new(),
            "1. Click the **Open Devtool** icon in the top-right corner (or press `Ctrl + \\``)"
                .to_string(),
            "2. In the Devtools panel, click **Type Check + Run Tests** to validate your solution"
                .to_string(),
            "3. For `console.log` output and assertion results, open your **browser DevTools** (`F12` > Console tab)"
                .to_string(),
            String::new(),
            "### Locally".to_string(),
            String::new(),
            "```bash".to_string(),
            "npm install".to_string(),
            "npm test    # runs tsc --noEmit && tsx challenge.test.ts".to_string(),
            "```".to_string(),
            String::new(),
            "## Evaluation Checklist".to_string(),
            String::new(),
            self.evaluation_checklist.clone(),
        ];
        if !self.bonus.trim().is_empty() {
            lines.extend([
                String::new(),
                "## Bonus".to_string(),
                String::new(),
                self.bonus.clone(),
            ]);
        }
        lines.push(String::new());
        lines.join("\n")
    }

    /// Write every file under `dir` (a blob key prefix).
    ///
    /// Returns the keys written.
    pub fn write_to<B: BlobStore>(&self, blobs: &B, dir: &str) -> std::io::Result<Vec<String>> {
        let dir = dir.trim_end_matches('/');
        let mut written = Vec::new();
        for file in self.files() {
            let key = format!("{dir}/{}", file.name);
            blobs.write(&key, file.content.as_bytes())?;
            written.push(key);
        }
        Ok(written)
    }
}

/// Two-space JSON with a trailing newline. `Value` always serializes.
fn pretty(value: &serde_json::Value) -> String {
    let mut out = serde_json::to_string_pretty(value).unwrap_or_default();
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;

    fn bundle(bonus: &str) -> ExerciseBundle {
        ExerciseBundle {
            date: "2026-02-14".to_string(),
            title: "Typed LRU Cache".to_string(),
            difficulty: Difficulty::Hard,
            scenario: "A CDN edge caches responses.".to_string(),
            challenge_source: "export class LRU<K, V> {}\n".to_string(),
            test_source: "import { LRU } from './challenge';\n".to_string(),
            evaluation_checklist: "| Skill | Where |".to_string(),
            bonus: bonus.to_string(),
        }
    }

    #[test]
    fn sources_are_written_verbatim() {
        let files = bundle("").files();
        assert_eq!(files[0].name, "challenge.ts");
        assert_eq!(files[0].content, "export class LRU<K, V> {}\n");
        assert_eq!(files[1].content, "import { LRU } from './challenge';\n");
    }

    #[test]
    fn readme_includes_sections() {
        let readme = bundle("").readme();
        assert!(readme.starts_with("# Typed LRU Cache\n"));
        assert!(readme.contains("**Difficulty:** Hard"));
        assert!(readme.contains("## Scenario\n\nA CDN edge caches responses."));
        assert!(readme.contains("## Evaluation Checklist\n\n| Skill | Where |"));
        assert!(!readme.contains("## Bonus"));
    }

    #[test]
    fn readme_includes_bonus_when_present() {
        let readme = bundle("Add TTL support.").readme();
        assert!(readme.contains("## Bonus\n\nAdd TTL support.\n"));
    }

    #[test]
    fn package_name_uses_date() {
        let files = bundle("").files();
        let package = files.iter().find(|f| f.name == "package.json").unwrap();
        let value: serde_json::Value = serde_json::from_str(&package.content).unwrap();
        assert_eq!(value["name"], "ts-challenge-2026-02-14");
        assert_eq!(value["scripts"]["test"], "tsc --noEmit && tsx challenge.test.ts");
    }

    #[test]
    fn write_to_places_files_under_dir() {
        let blobs = MemoryBlobStore::new();
        let written = bundle("").write_to(&blobs, "challenge-output/").unwrap();
        assert_eq!(written.len(), 6);
        assert!(blobs.keys().contains(&"challenge-output/.codesandbox/tasks.json".to_string()));
        assert!(blobs.text("challenge-output/tsconfig.json").unwrap().contains("\"strict\": true"));
    }
}
