// code-change classifier - tags a diff line with the first matching pattern kind

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::models::CodeChange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Function,
    Import,
    Export,
    Component,
    Api,
    State,
    Hook,
    Routing,
    Styling,
    Persistence,
    Auth,
    Validation,
    Test,
    Env,
    EventHandler,
    DataFetching,
    Form,
    General,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Function => "function",
            ChangeKind::Import => "import",
            ChangeKind::Export => "export",
            ChangeKind::Component => "component",
            ChangeKind::Api => "api",
            ChangeKind::State => "state",
            ChangeKind::Hook => "hook",
            ChangeKind::Routing => "routing",
            ChangeKind::Styling => "styling",
            ChangeKind::Persistence => "persistence",
            ChangeKind::Auth => "auth",
            ChangeKind::Validation => "validation",
            ChangeKind::Test => "test",
            ChangeKind::Env => "env",
            ChangeKind::EventHandler => "event_handler",
            ChangeKind::DataFetching => "data_fetching",
            ChangeKind::Form => "form",
            ChangeKind::General => "general",
        }
    }

    /// functionality label shown in prompts and summaries
    pub fn functionality(self) -> Option<&'static str> {
        match self {
            ChangeKind::Auth => Some("Authentication system"),
            ChangeKind::Api => Some("API integration"),
            ChangeKind::State => Some("State management"),
            ChangeKind::Routing => Some("Navigation and routing"),
            ChangeKind::Form => Some("Form handling"),
            ChangeKind::DataFetching => Some("Data fetching"),
            ChangeKind::Validation => Some("Input validation"),
            ChangeKind::Persistence => Some("Data persistence"),
            ChangeKind::Test => Some("Test coverage"),
            ChangeKind::Styling => Some("Styling and layout"),
            ChangeKind::Env => Some("Environment configuration"),
            ChangeKind::Component => Some("UI components"),
            ChangeKind::EventHandler => Some("User interactions"),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: ChangeKind,
    pub info: Option<String>,
}

lazy_static! {
    // priority order, first match wins
    static ref PATTERNS: Vec<(ChangeKind, Regex)> = vec![
        (ChangeKind::Function, Regex::new(
            r"\b(?:async\s+)?(?:function\*?|class|def|fn)\s+([A-Za-z_$][\w$]*)|\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*=>|[A-Za-z_$][\w$]*\s*=>)"
        ).unwrap()),
        (ChangeKind::Import, Regex::new(
            r#"^\s*import\s+(?:[\w*{}\s,$]+\s+from\s+)?['"]([^'"]+)['"]|\brequire\(\s*['"]([^'"]+)['"]\s*\)"#
        ).unwrap()),
        (ChangeKind::Export, Regex::new(
            r"\bexport\s+(?:default\s+)?(?:async\s+)?(?:const|let|var|function|class|interface|type)?\s*([A-Za-z_$][\w$]*)|\bmodule\.exports\b\.?([A-Za-z_$][\w$]*)?"
        ).unwrap()),
        (ChangeKind::Component, Regex::new(
            r"<([A-Z][A-Za-z0-9]*)[\s/>]"
        ).unwrap()),
        (ChangeKind::Api, Regex::new(
            r#"\b(?:fetch|axios(?:\.(?:get|post|put|patch|delete))?)\s*\(\s*['"`]([^'"`]+)['"`]|\b(?:api|apiClient|http)\.(get|post|put|patch|delete)\s*\("#
        ).unwrap()),
        (ChangeKind::State, Regex::new(
            r"\b(useState|useReducer|createStore|configureStore|createSlice|combineReducers|useSelector|useDispatch|makeAutoObservable|makeObservable|createContext|atom|writable)\s*[(<]"
        ).unwrap()),
        (ChangeKind::Hook, Regex::new(
            r"\b(use[A-Z][A-Za-z0-9]*)\s*\("
        ).unwrap()),
        (ChangeKind::Routing, Regex::new(
            r"<(Route|Routes|Link|NavLink|Navigate)\b|\b(?:router|app|Router)\.(get|post|put|patch|delete|push|replace|use)\s*\("
        ).unwrap()),
        (ChangeKind::Styling, Regex::new(
            r#"\bstyled\.([a-z]+)|\bclassName\s*=\s*["'{`]+([^"'}`]*)|\bstyle\s*=\s*\{\{|@media\b|\bcss`"#
        ).unwrap()),
        (ChangeKind::Persistence, Regex::new(
            r"\b(localStorage|sessionStorage|indexedDB|AsyncStorage)\b|\b(?:db|prisma|mongoose|knex|supabase)\.(\w+)"
        ).unwrap()),
        (ChangeKind::Auth, Regex::new(
            r"\b(login|logout|signIn|signOut|signUp|authenticate|authorize|verifyToken|refreshToken|getSession)\s*\(|\b(jwt|passport|bcrypt|auth)\.\w+"
        ).unwrap()),
        (ChangeKind::Validation, Regex::new(
            r"\b(validate[A-Za-z]*|isValid[A-Za-z]*)\s*\(|\b(yup|zod|Joi|z)\.[a-z]+\s*\("
        ).unwrap()),
        (ChangeKind::Test, Regex::new(
            r"\b(describe|it|test|expect|beforeEach|afterEach|beforeAll|afterAll)\s*\(|\b(jest|vi|cy|sinon)\.\w+"
        ).unwrap()),
        (ChangeKind::Env, Regex::new(
            r"\bprocess\.env\.([A-Z_][A-Z0-9_]*)|\bimport\.meta\.env\.([A-Z_][A-Z0-9_]*)"
        ).unwrap()),
        (ChangeKind::EventHandler, Regex::new(
            r#"\b(on[A-Z][A-Za-z]*)\s*=\s*\{|\baddEventListener\(\s*['"](\w+)['"]"#
        ).unwrap()),
        (ChangeKind::DataFetching, Regex::new(
            r"\b(useQuery|useMutation|useInfiniteQuery|useSWR|getServerSideProps|getStaticProps|loader)\b|\b(queryClient)\.\w+"
        ).unwrap()),
        (ChangeKind::Form, Regex::new(
            r"\b(handleSubmit|useForm|Formik|FormData|setFieldValue)\b|<(form|select|textarea)\b"
        ).unwrap()),
    ];
}

/// classify one cleaned diff line
pub fn classify_line(line: &str) -> Classification {
    for (kind, pattern) in PATTERNS.iter() {
        if let Some(caps) = pattern.captures(line) {
            let info = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            return Classification { kind: *kind, info };
        }
    }

    Classification {
        kind: ChangeKind::General,
        info: None,
    }
}

/// classify and package a line as a [`CodeChange`]
pub fn classify(content: &str, line_number: usize) -> CodeChange {
    let Classification { kind, info } = classify_line(content);
    CodeChange {
        kind,
        content: content.to_string(),
        info,
        context: kind.functionality().map(str::to_string),
        line_number,
    }
}

/// the fixed priority order, exposed for documentation and tests
pub fn priority_order() -> Vec<ChangeKind> {
    PATTERNS.iter().map(|(kind, _)| *kind).collect()
}
