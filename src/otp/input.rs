/// What an edit did to the code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpEvent {
    /// Every slot is filled; submit this code.
    Complete(String),
    Changed,
    Ignored,
}

/// Fixed-length digit entry with per-slot focus.
///
/// Always holds exactly `len` slots, each empty or one ASCII digit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpInput {
    slots: Vec<Option<char>>,
    focus: usize,
}

impl OtpInput {
    pub const LOGIN_LEN: usize = 6;
    pub const DELIVERY_LEN: usize = 4;

    /// # Panics
    ///
    /// Panics if `len` is zero.
    pub fn new(len: usize) -> Self {
        assert!(len > 0, "OTP length must be at least one digit");
        Self {
            slots: vec![None; len],
            focus: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn slots(&self) -> &[Option<char>] {
        &self.slots
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// The filled digits in slot order.
    pub fn value(&self) -> String {
        self.slots.iter().flatten().collect()
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
        self.focus = 0;
    }

    /// Handles text typed or pasted into slot `index`.
    ///
    /// More than one character is a paste: its digits replace the whole code
    /// from slot 0, extra digits are dropped and focus lands on the last
    /// filled slot.
    pub fn input(&mut self, index: usize, text: &str) -> OtpEvent {
        if index >= self.len() {
            return OtpEvent::Ignored;
        }

        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (None, _) => {
                self.slots[index] = None;
                self.focus = index;
                OtpEvent::Changed
            }
            (Some(c), None) => {
                if !c.is_ascii_digit() {
                    return OtpEvent::Ignored;
                }
                self.slots[index] = Some(c);
                self.focus = (index + 1).min(self.len() - 1);
                self.settle()
            }
            (Some(_), Some(_)) => self.paste(text),
        }
    }

    fn paste(&mut self, text: &str) -> OtpEvent {
        let digits: Vec<char> = text
            .chars()
            .filter(char::is_ascii_digit)
            .take(self.len())
            .collect();
        if digits.is_empty() {
            return OtpEvent::Ignored;
        }
        self.clear();
        for (slot, digit) in self.slots.iter_mut().zip(&digits) {
            *slot = Some(*digit);
        }
        self.focus = digits.len() - 1;
        self.settle()
    }

    /// Backspace in slot `index`: clears it, or if it is already empty,
    /// moves back and clears the previous slot.
    pub fn backspace(&mut self, index: usize) -> OtpEvent {
        if index >= self.len() {
            return OtpEvent::Ignored;
        }
        if self.slots[index].is_some() {
            self.slots[index] = None;
            self.focus = index;
            OtpEvent::Changed
        } else if index > 0 {
            self.slots[index - 1] = None;
            self.focus = index - 1;
            OtpEvent::Changed
        } else {
            OtpEvent::Ignored
        }
    }

    fn settle(&self) -> OtpEvent {
        if self.is_complete() {
            OtpEvent::Complete(self.value())
        } else {
            OtpEvent::Changed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_advances_and_completes() {
        let mut otp = OtpInput::new(4);
        assert_eq!(otp.input(0, "4"), OtpEvent::Changed);
        assert_eq!(otp.focus(), 1);
        otp.input(1, "8");
        otp.input(2, "2");
        assert_eq!(otp.input(3, "1"), OtpEvent::Complete("4821".into()));
        assert_eq!(otp.focus(), 3);
    }

    #[test]
    fn non_digits_are_ignored() {
        let mut otp = OtpInput::new(6);
        assert_eq!(otp.input(0, "a"), OtpEvent::Ignored);
        assert!(otp.is_empty());
        assert_eq!(otp.input(9, "1"), OtpEvent::Ignored);
    }

    #[test]
    fn long_paste_truncates_and_focuses_last_slot() {
        let mut otp = OtpInput::new(6);
        assert_eq!(otp.input(2, "12345678"), OtpEvent::Complete("123456".into()));
        assert_eq!(otp.focus(), 5);
        assert!(otp.slots().iter().all(|s| s.is_some()));
    }

    #[test]
    fn short_paste_fills_from_first_slot() {
        let mut otp = OtpInput::new(6);
        otp.input(0, "9");
        assert_eq!(otp.input(4, "1 2-3"), OtpEvent::Changed);
        assert_eq!(otp.value(), "123");
        assert_eq!(otp.slots()[3], None);
        assert_eq!(otp.focus(), 2);
    }

    #[test]
    fn backspace_on_empty_slot_clears_previous() {
        let mut otp = OtpInput::new(4);
        otp.input(0, "1");
        otp.input(1, "2");
        assert_eq!(otp.backspace(2), OtpEvent::Changed);
        assert_eq!(otp.value(), "1");
        assert_eq!(otp.focus(), 1);
        assert_eq!(otp.backspace(0), OtpEvent::Changed);
        assert_eq!(otp.backspace(0), OtpEvent::Ignored);
    }

    #[test]
    fn slot_count_never_changes() {
        let mut otp = OtpInput::new(4);
        for text in ["1", "", "12", "123456789", "x", "٣"] {
            otp.input(1, text);
            assert_eq!(otp.len(), 4);
            assert!(otp.slots().iter().flatten().all(char::is_ascii_digit));
        }
    }

    #[test]
    fn slot_count_matches_length() {
        assert_eq!(OtpInput::new(OtpInput::LOGIN_LEN).slots().len(), 6);
        assert_eq!(OtpInput::new(OtpInput::DELIVERY_LEN).slots().len(), 4);
    }

    #[test]
    #[should_panic(expected = "at least one digit")]
    fn zero_length_is_rejected() {
        let _ = OtpInput::new(0);
    }
}
