use crate::error::ParseError;

/// Kind of difference a file carries, as reported by `git diff --name-status`
///
/// Rename bookkeeping lives inside the variant, so the pre-rename path and
/// similarity score exist exactly when the state is `Renamed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeState {
    Added,
    Modified,
    Deleted,
    Renamed {
        original_path: String,
        similarity: u32,
    },
    Conflicted,
}

/// One file-level change in the working tree or index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub state: ChangeState,
    /// Repository-relative path; for renames, the post-rename path
    pub path: String,
    /// Whether the change is recorded in the index
    pub staged: bool,
    /// Transient UI-selection flag; irrelevant to parsing and ordering
    pub selected: bool,
}

impl Change {
    /// Parse one raw status line
    ///
    /// Untracked lines (`tracked = false`) are bare paths and always come out
    /// as unstaged additions. Tracked lines are tab-separated
    /// `<code>\t<path>[\t<new_path>]`, where the leading character of the code
    /// selects the state and a rename's numeric suffix is its similarity
    /// percentage.
    pub fn parse(line: &str, tracked: bool, staged: bool) -> Result<Self, ParseError> {
        if !tracked {
            return Ok(Self {
                state: ChangeState::Added,
                path: line.to_string(),
                staged: false,
                selected: false,
            });
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 2 {
            return Err(ParseError::MalformedLine(line.to_string()));
        }

        let code = fields[0];
        let state = match code.chars().next() {
            Some('A') => ChangeState::Added,
            Some('M') => ChangeState::Modified,
            Some('D') => ChangeState::Deleted,
            Some('U') => ChangeState::Conflicted,
            Some('R') => {
                let similarity = code[1..]
                    .parse::<u32>()
                    .map_err(|_| ParseError::MalformedLine(line.to_string()))?;
                let new_path = fields
                    .get(2)
                    .ok_or_else(|| ParseError::MalformedLine(line.to_string()))?;

                return Ok(Self {
                    state: ChangeState::Renamed {
                        original_path: fields[1].to_string(),
                        similarity,
                    },
                    path: new_path.to_string(),
                    staged,
                    selected: false,
                });
            }
            _ => {
                return Err(ParseError::UnrecognizedStatus {
                    code: code.to_string(),
                    line: line.to_string(),
                });
            }
        };

        Ok(Self {
            state,
            path: fields[1].to_string(),
            staged,
            selected: false,
        })
    }

    /// Basename of `path`, always derived
    pub fn display_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Pre-rename path, present only for renames
    pub fn original_path(&self) -> Option<&str> {
        match &self.state {
            ChangeState::Renamed { original_path, .. } => Some(original_path),
            _ => None,
        }
    }

    /// Rename-detection confidence, present only for renames
    pub fn similarity(&self) -> Option<u32> {
        match &self.state {
            ChangeState::Renamed { similarity, .. } => Some(*similarity),
            _ => None,
        }
    }

    /// Order a change list by path (byte order, stable) for deterministic display
    pub fn sort(changes: &mut [Change]) {
        changes.sort_by(|a, b| a.path.cmp(&b.path));
    }
}
