//! Line scanner over build output.
//!
//! Recognises the tool's `[WARNING]` / `[ERROR]` prefixes and the reactor
//! summary lines that mark a module as finished:
//!
//! ```text
//! [INFO] Reactor Summary for parent 1.0:
//! [INFO] credentials ........................................ SUCCESS [  2.345 s]
//! [INFO] credentials-tests .................................. FAILURE [  0.812 s]
//! ```

/// Keep at most this many warnings or errors per build.
const MAX_MESSAGES: usize = 200;

/// Accumulated findings from one build's output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputScanner {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    /// Modules the reactor summary reports as `SUCCESS`, in summary order.
    pub succeeded: Vec<String>,
    in_summary: bool,
}

impl OutputScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line of output (without the trailing newline).
    pub fn feed(&mut self, line: &str) {
        let line = line.trim_end();

        if let Some(message) = line.strip_prefix("[WARNING]") {
            push_capped(&mut self.warnings, message.trim());
            return;
        }
        if let Some(message) = line.strip_prefix("[ERROR]") {
            push_capped(&mut self.errors, message.trim());
            return;
        }

        let Some(info) = line.strip_prefix("[INFO]") else {
            return;
        };
        let info = info.trim();
        if info.starts_with("Reactor Summary") {
            self.in_summary = true;
            return;
        }
        if self.in_summary {
            if info.starts_with("BUILD SUCCESS") || info.starts_with("BUILD FAILURE") {
                self.in_summary = false;
            } else if let Some(module) = parse_summary_line(info, "SUCCESS") {
                self.succeeded.push(module);
            }
        }
    }
}

fn push_capped(messages: &mut Vec<String>, message: &str) {
    if !message.is_empty() && messages.len() < MAX_MESSAGES {
        messages.push(message.to_owned());
    }
}

/// Parse `name ....... STATUS [ time ]`, returning `name` when the status matches.
fn parse_summary_line(info: &str, status: &str) -> Option<String> {
    let dots = info.find(" ..")?;
    let name = info.get(..dots)?.trim();
    let rest = info.get(dots..)?.trim_start_matches([' ', '.']);
    if name.is_empty() || !rest.starts_with(status) {
        return None;
    }
    // Maven 3.6+ appends the module version after the name.
    let name = match name.rsplit_once(' ') {
        Some((base, version)) if version.starts_with(|c: char| c.is_ascii_digit()) => base,
        _ => name,
    };
    Some(name.to_owned())
}
