//! The script value stack as the bridge sees it.
//!
//! Dispatch operations read their argument window from the top of the
//! stack and push results above it. On failure the stack is truncated
//! back to its pre-operation height so the runtime's error unwind never
//! sees stray values.

use lira_sdk::ScriptValue;

/// Growable stack of script values.
#[derive(Debug, Default)]
pub struct ValueStack {
    values: Vec<ScriptValue>,
}

impl ValueStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Current height.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Push a value on top.
    pub fn push(&mut self, value: ScriptValue) {
        self.values.push(value);
    }

    /// Pop the top value.
    pub fn pop(&mut self) -> Option<ScriptValue> {
        self.values.pop()
    }

    /// Read a value by absolute index from the bottom.
    pub fn get(&self, index: usize) -> Option<&ScriptValue> {
        self.values.get(index)
    }

    /// The top value without popping it.
    pub fn top(&self) -> Option<&ScriptValue> {
        self.values.last()
    }

    /// Drop values until the stack is `len` high. No-op if already lower.
    pub fn truncate(&mut self, len: usize) {
        self.values.truncate(len);
    }

    /// The top `count` values, bottom-most first. `None` if the stack is
    /// shorter than `count`.
    pub fn window(&self, count: usize) -> Option<&[ScriptValue]> {
        self.values.len().checked_sub(count).map(|base| &self.values[base..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop() {
        let mut stack = ValueStack::new();
        assert!(stack.is_empty());
        stack.push(ScriptValue::Int(1));
        stack.push(ScriptValue::Str("a".into()));
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.top(), Some(&ScriptValue::Str("a".into())));
        assert_eq!(stack.pop(), Some(ScriptValue::Str("a".into())));
        assert_eq!(stack.pop(), Some(ScriptValue::Int(1)));
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn test_truncate_restores_height() {
        let mut stack = ValueStack::new();
        stack.push(ScriptValue::Int(1));
        let base = stack.len();
        stack.push(ScriptValue::Int(2));
        stack.push(ScriptValue::Int(3));
        stack.truncate(base);
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.top(), Some(&ScriptValue::Int(1)));
        // Truncating above the current height changes nothing.
        stack.truncate(10);
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_window() {
        let mut stack = ValueStack::new();
        stack.push(ScriptValue::Int(1));
        stack.push(ScriptValue::Int(2));
        stack.push(ScriptValue::Int(3));
        let window = stack.window(2).unwrap();
        assert_eq!(window, &[ScriptValue::Int(2), ScriptValue::Int(3)]);
        assert_eq!(stack.window(0).unwrap().len(), 0);
        assert!(stack.window(4).is_none());
    }
}
