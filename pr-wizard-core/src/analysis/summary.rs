// summary synthesis - one sentence per hunk, file or change set
//
// rules are tried in priority order and exactly one fires

use super::classifier::ChangeKind;
use super::models::CodeChange;

/// describe a set of added/removed lines in one sentence
pub fn summarize_changes(added: &[CodeChange], removed: &[CodeChange]) -> String {
    let has = |kind: ChangeKind| {
        added.iter().chain(removed.iter()).any(|c| c.kind == kind)
    };

    if has(ChangeKind::State) {
        return describe_state_transition(added, removed);
    }
    if has(ChangeKind::Auth) {
        return "Updated authentication flow and session handling".to_string();
    }
    if has(ChangeKind::Api) {
        let endpoints = infos(added.iter().chain(removed.iter()), ChangeKind::Api);
        return if endpoints.is_empty() {
            "Updated API integration".to_string()
        } else {
            format!("Updated API integration for {}", endpoints.join(", "))
        };
    }
    if has(ChangeKind::Routing) {
        return "Updated navigation and routing".to_string();
    }
    if has(ChangeKind::Form) {
        return "Improved form handling and submission".to_string();
    }
    if has(ChangeKind::DataFetching) {
        return "Updated data fetching logic".to_string();
    }

    let added_fns = infos(added.iter(), ChangeKind::Function);
    let removed_fns = infos(removed.iter(), ChangeKind::Function);
    if !added_fns.is_empty() || !removed_fns.is_empty() {
        return describe_named_changes("function", &added_fns, &removed_fns, true);
    }

    let added_deps = infos(added.iter(), ChangeKind::Import);
    let removed_deps = infos(removed.iter(), ChangeKind::Import);
    if !added_deps.is_empty() || !removed_deps.is_empty() {
        return describe_named_changes("dependency", &added_deps, &removed_deps, false);
    }

    if has(ChangeKind::Component) {
        return "Updated UI components".to_string();
    }
    if has(ChangeKind::Env) {
        return "Updated environment configuration".to_string();
    }
    if has(ChangeKind::Styling) {
        return "Adjusted styling and layout".to_string();
    }
    if has(ChangeKind::Test) {
        return "Updated test coverage".to_string();
    }

    match (added.len(), removed.len()) {
        (0, 0) => "No significant code changes".to_string(),
        (a, 0) => format!("Added {a} {}", plural(a, "line", "lines")),
        (0, r) => format!("Removed {r} {}", plural(r, "line", "lines")),
        (a, r) => format!("Refactored {} {}", a + r, plural(a + r, "line", "lines")),
    }
}

/// name the state technology behind a captured construct
pub fn state_technology(construct: &str) -> &'static str {
    match construct {
        "useState" | "useReducer" => "React hooks",
        "createContext" => "React Context",
        "createStore" | "configureStore" | "createSlice" | "combineReducers" | "useSelector"
        | "useDispatch" => "Redux",
        "makeAutoObservable" | "makeObservable" => "MobX",
        "atom" => "atoms",
        "writable" => "Svelte stores",
        _ => "local state",
    }
}

fn describe_state_transition(added: &[CodeChange], removed: &[CodeChange]) -> String {
    let tech = |lines: &[CodeChange]| {
        lines
            .iter()
            .filter(|c| c.kind == ChangeKind::State)
            .find_map(|c| c.info.as_deref())
            .map(state_technology)
    };

    match (tech(removed), tech(added)) {
        (Some(old), Some(new)) if old != new => {
            format!("Migrated state management from {old} to {new}")
        }
        (Some(_), Some(new)) => format!("Updated {new} state management"),
        (None, Some(new)) => format!("Introduced {new} state management"),
        (Some(old), None) => format!("Removed {old} state management"),
        (None, None) => "Updated state management".to_string(),
    }
}

fn describe_named_changes(
    noun: &str,
    added: &[String],
    removed: &[String],
    detect_refactor: bool,
) -> String {
    let refactored: Vec<String> = if detect_refactor {
        added.iter().filter(|n| removed.contains(n)).cloned().collect()
    } else {
        Vec::new()
    };
    let only_added: Vec<String> = added.iter().filter(|n| !refactored.contains(n)).cloned().collect();
    let only_removed: Vec<String> =
        removed.iter().filter(|n| !refactored.contains(n)).cloned().collect();

    let plural_noun = if noun == "dependency" { "dependencies" } else { "functions" };
    let mut parts = Vec::new();
    if !only_added.is_empty() {
        parts.push(format!(
            "added {} {}",
            plural(only_added.len(), noun, plural_noun),
            only_added.join(", ")
        ));
    }
    if !only_removed.is_empty() {
        parts.push(format!(
            "removed {} {}",
            plural(only_removed.len(), noun, plural_noun),
            only_removed.join(", ")
        ));
    }
    if !refactored.is_empty() {
        parts.push(format!(
            "refactored {} {}",
            plural(refactored.len(), noun, plural_noun),
            refactored.join(", ")
        ));
    }

    capitalize(&parts.join("; "))
}

/// distinct captured names of a kind, in first-seen order
fn infos<'a>(lines: impl Iterator<Item = &'a CodeChange>, kind: ChangeKind) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for line in lines.filter(|c| c.kind == kind) {
        if let Some(info) = &line.info {
            if !names.contains(info) {
                names.push(info.clone());
            }
        }
    }
    names
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 {
        one
    } else {
        many
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::classifier::classify;

    fn lines(texts: &[&str]) -> Vec<CodeChange> {
        texts.iter().enumerate().map(|(i, t)| classify(t, i + 1)).collect()
    }

    fn kinds(kinds: &[ChangeKind]) -> Vec<CodeChange> {
        kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| CodeChange {
                kind: *kind,
                content: format!("line {i}"),
                info: None,
                context: None,
                line_number: i + 1,
            })
            .collect()
    }

    #[test]
    fn test_state_migration_wins_over_everything() {
        let added = lines(&["const store = configureStore({ reducer });", "await signIn(user);"]);
        let removed = lines(&["const [user, setUser] = useState(null);"]);
        assert_eq!(
            summarize_changes(&added, &removed),
            "Migrated state management from React hooks to Redux"
        );
    }

    #[test]
    fn test_auth_before_api() {
        let added = lines(&["await logout();", "await fetch('/api/session');"]);
        assert_eq!(
            summarize_changes(&added, &[]),
            "Updated authentication flow and session handling"
        );
    }

    #[test]
    fn test_api_lists_endpoints() {
        let added = lines(&["await fetch('/api/users');", "await fetch('/api/teams');"]);
        assert_eq!(
            summarize_changes(&added, &[]),
            "Updated API integration for /api/users, /api/teams"
        );
    }

    #[test]
    fn test_function_framing() {
        let added = lines(&["function createUser() {", "function renderList() {"]);
        let removed = lines(&["function renderList() {", "function legacyInit() {"]);
        assert_eq!(
            summarize_changes(&added, &removed),
            "Added function createUser; removed function legacyInit; refactored function renderList"
        );
    }

    #[test]
    fn test_dependency_changes() {
        let added = lines(&["import axios from 'axios';"]);
        let removed = lines(&["const request = require('request');"]);
        assert_eq!(
            summarize_changes(&added, &removed),
            "Added dependency axios; removed dependency request"
        );
    }

    #[test]
    fn test_kind_presence_phrases() {
        assert_eq!(summarize_changes(&lines(&["<UserCard user={u} />"]), &[]), "Updated UI components");
        assert_eq!(
            summarize_changes(&lines(&["const port = process.env.PORT;"]), &[]),
            "Updated environment configuration"
        );
    }

    #[test]
    fn test_each_presence_rule_phrase() {
        let cases = [
            (ChangeKind::Routing, "Updated navigation and routing"),
            (ChangeKind::Form, "Improved form handling and submission"),
            (ChangeKind::DataFetching, "Updated data fetching logic"),
            (ChangeKind::Component, "Updated UI components"),
            (ChangeKind::Env, "Updated environment configuration"),
            (ChangeKind::Styling, "Adjusted styling and layout"),
            (ChangeKind::Test, "Updated test coverage"),
        ];
        for (kind, expected) in cases {
            assert_eq!(summarize_changes(&kinds(&[kind]), &[]), expected, "{kind}");
            assert_eq!(summarize_changes(&[], &kinds(&[kind])), expected, "{kind} removed");
        }
    }

    #[test]
    fn test_earlier_rule_wins_when_two_kinds_present() {
        let pairs = [
            (ChangeKind::Routing, ChangeKind::Form, "Updated navigation and routing"),
            (ChangeKind::Form, ChangeKind::DataFetching, "Improved form handling and submission"),
            (ChangeKind::DataFetching, ChangeKind::Component, "Updated data fetching logic"),
            (ChangeKind::Component, ChangeKind::Env, "Updated UI components"),
            (ChangeKind::Env, ChangeKind::Styling, "Updated environment configuration"),
            (ChangeKind::Styling, ChangeKind::Test, "Adjusted styling and layout"),
        ];
        for (earlier, later, expected) in pairs {
            // listing order must not matter, only rule order
            assert_eq!(summarize_changes(&kinds(&[later, earlier]), &[]), expected);
            assert_eq!(summarize_changes(&kinds(&[later]), &kinds(&[earlier])), expected);
        }
    }

    #[test]
    fn test_component_env_styling_test_cascade() {
        let mut present = vec![ChangeKind::Test, ChangeKind::Styling, ChangeKind::Env, ChangeKind::Component];
        let expected = [
            "Updated UI components",
            "Updated environment configuration",
            "Adjusted styling and layout",
            "Updated test coverage",
        ];
        for phrase in expected {
            assert_eq!(summarize_changes(&kinds(&present), &[]), phrase);
            present.pop();
        }
    }

    #[test]
    fn test_named_functions_outrank_presence_rules() {
        let mut added = kinds(&[ChangeKind::Component, ChangeKind::Test]);
        added.extend(lines(&["function createUser() {"]));
        assert_eq!(summarize_changes(&added, &[]), "Added function createUser");
    }

    #[test]
    fn test_generic_count_fallback() {
        let a = lines(&["total += 1;", "count -= 2;"]);
        let r = lines(&["total = 0;"]);
        assert_eq!(summarize_changes(&a, &[]), "Added 2 lines");
        assert_eq!(summarize_changes(&[], &r), "Removed 1 line");
        assert_eq!(summarize_changes(&a, &r), "Refactored 3 lines");
        assert_eq!(summarize_changes(&[], &[]), "No significant code changes");
    }

    #[test]
    fn test_summary_is_deterministic() {
        let a = lines(&["function a() {", "import x from 'x';"]);
        let r = lines(&["function b() {"]);
        assert_eq!(summarize_changes(&a, &r), summarize_changes(&a, &r));
    }
}
