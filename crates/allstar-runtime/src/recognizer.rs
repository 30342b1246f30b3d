//! Shared recognizer state.
//!
//! Both the lexer and the parser carry one of these: the current ATN
//! state, the listener list, and the name tables. Name-to-number maps are
//! cached process-wide per name vector (name vectors are stable for a
//! given grammar) behind a mutex, double-checked on miss.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, LazyLock, Mutex};

use allstar_core::{TOKEN_EOF, TOKEN_INVALID_TYPE, Token, Vocabulary};

use crate::error_listener::{ConsoleErrorListener, ErrorListener};
use crate::errors::RecognitionError;

type NameMapCache = Mutex<HashMap<Vec<String>, Arc<HashMap<String, i32>>>>;

static TOKEN_TYPE_MAPS: LazyLock<NameMapCache> = LazyLock::new(|| Mutex::new(HashMap::new()));
static RULE_INDEX_MAPS: LazyLock<NameMapCache> = LazyLock::new(|| Mutex::new(HashMap::new()));

/// State common to every recognizer instance.
pub struct Recognizer {
    pub rule_names: Vec<String>,
    pub vocabulary: Vocabulary,
    /// Current ATN state; -1 before the first rule entry.
    state: isize,
    listeners: Vec<Box<dyn ErrorListener>>,
}

impl Recognizer {
    pub fn new(rule_names: Vec<String>, vocabulary: Vocabulary) -> Self {
        Self {
            rule_names,
            vocabulary,
            state: -1,
            listeners: vec![Box::new(ConsoleErrorListener)],
        }
    }

    #[inline]
    pub fn state(&self) -> isize {
        self.state
    }

    #[inline]
    pub fn set_state(&mut self, state: usize) {
        self.state = state as isize;
    }

    pub fn add_error_listener(&mut self, listener: Box<dyn ErrorListener>) {
        self.listeners.push(listener);
    }

    pub fn remove_error_listeners(&mut self) {
        self.listeners.clear();
    }

    /// Dispatch a syntax error to every attached listener.
    pub fn notify_error_listeners(
        &mut self,
        offending_symbol: Option<&Rc<Token>>,
        line: usize,
        column: usize,
        msg: &str,
        error: Option<&RecognitionError>,
    ) {
        for listener in &mut self.listeners {
            listener.syntax_error(offending_symbol, line, column, msg, error);
        }
    }

    pub fn listeners_mut(&mut self) -> &mut [Box<dyn ErrorListener>] {
        &mut self.listeners
    }

    /// Symbolic/literal name to token type, cached per name vector.
    pub fn token_type_map(&self) -> Arc<HashMap<String, i32>> {
        let names = all_display_names(&self.vocabulary);
        if let Some(map) = TOKEN_TYPE_MAPS.lock().unwrap().get(&names) {
            return Arc::clone(map);
        }

        let mut map = HashMap::new();
        for t in 0..=self.vocabulary.max_token_type() {
            if let Some(name) = self.vocabulary.literal_name(t) {
                map.insert(name.to_owned(), t);
            }
            if let Some(name) = self.vocabulary.symbolic_name(t) {
                map.insert(name.to_owned(), t);
            }
        }
        map.insert("EOF".to_owned(), TOKEN_EOF);
        let map = Arc::new(map);

        let mut cache = TOKEN_TYPE_MAPS.lock().unwrap();
        Arc::clone(cache.entry(names).or_insert(map))
    }

    /// Rule name to index, cached per name vector.
    pub fn rule_index_map(&self) -> Arc<HashMap<String, i32>> {
        if let Some(map) = RULE_INDEX_MAPS.lock().unwrap().get(&self.rule_names) {
            return Arc::clone(map);
        }

        let map: HashMap<String, i32> = self
            .rule_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i as i32))
            .collect();
        let map = Arc::new(map);

        let mut cache = RULE_INDEX_MAPS.lock().unwrap();
        Arc::clone(cache.entry(self.rule_names.clone()).or_insert(map))
    }

    pub fn token_type(&self, name: &str) -> i32 {
        self.token_type_map()
            .get(name)
            .copied()
            .unwrap_or(TOKEN_INVALID_TYPE)
    }

    pub fn rule_names_as_str(&self) -> Vec<&str> {
        self.rule_names.iter().map(String::as_str).collect()
    }
}

fn all_display_names(vocabulary: &Vocabulary) -> Vec<String> {
    (0..=vocabulary.max_token_type())
        .map(|t| vocabulary.display_name(t))
        .collect()
}
