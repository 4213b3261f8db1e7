pub const ENTER_KEY: &str = "enter";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
    /// Line-break modifier.
    pub shift: bool,
}

impl KeyPress {
    pub fn new(key: impl Into<String>, shift: bool) -> Self {
        Self {
            key: key.into(),
            shift,
        }
    }

    pub fn enter() -> Self {
        Self::new(ENTER_KEY, false)
    }

    pub fn shift_enter() -> Self {
        Self::new(ENTER_KEY, true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyIntent {
    Submit,
    InsertNewline,
    Ignore,
}

pub fn classify(press: &KeyPress) -> KeyIntent {
    if !press.key.eq_ignore_ascii_case(ENTER_KEY) {
        return KeyIntent::Ignore;
    }

    if press.shift {
        KeyIntent::InsertNewline
    } else {
        KeyIntent::Submit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_submits_and_shift_enter_breaks_the_line() {
        assert_eq!(classify(&KeyPress::enter()), KeyIntent::Submit);
        assert_eq!(classify(&KeyPress::new("Enter", false)), KeyIntent::Submit);
        assert_eq!(classify(&KeyPress::shift_enter()), KeyIntent::InsertNewline);
    }

    #[test]
    fn other_keys_are_ignored() {
        assert_eq!(classify(&KeyPress::new("a", false)), KeyIntent::Ignore);
        assert_eq!(classify(&KeyPress::new("tab", true)), KeyIntent::Ignore);
    }
}
