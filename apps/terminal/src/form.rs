//! Field-by-field edit form over a `SignalEditor`.

use signaldesk_client::{ClientError, SignalEditor};
use signaldesk_core::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Entry(usize),
    Target(usize),
    StopLoss,
    Comment,
}

impl EditField {
    pub fn label(self) -> String {
        match self {
            EditField::Entry(i) => format!("Entry {}", i + 1),
            EditField::Target(i) => format!("Target {}", i + 1),
            EditField::StopLoss => "Stop loss".to_string(),
            EditField::Comment => "Comment".to_string(),
        }
    }
}

pub struct EditForm {
    pub editor: SignalEditor,
    pub symbol: String,
    pub selected: usize,
    /// Text being typed for the selected field.
    pub input: String,
    pub message: Option<String>,
}

impl std::fmt::Debug for EditForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditForm")
            .field("signal_id", &self.editor.signal_id())
            .field("selected", &self.selected)
            .finish()
    }
}

impl EditForm {
    pub fn new(signal: &Signal) -> Self {
        let mut editor = SignalEditor::new(signal);
        editor.begin();
        let mut form = Self {
            editor,
            symbol: signal.symbol.to_string(),
            selected: 0,
            input: String::new(),
            message: None,
        };
        form.reset_input();
        form
    }

    pub fn fields(&self) -> Vec<EditField> {
        let buffer = self.editor.buffer();
        (0..buffer.entries.len())
            .map(EditField::Entry)
            .chain((0..buffer.targets.len()).map(EditField::Target))
            .chain([EditField::StopLoss, EditField::Comment])
            .collect()
    }

    pub fn selected_field(&self) -> EditField {
        self.fields()
            .get(self.selected)
            .copied()
            .unwrap_or(EditField::Comment)
    }

    /// Current buffered value of `field`, as shown in the form.
    pub fn value(&self, field: EditField) -> String {
        let buffer = self.editor.buffer();
        match field {
            EditField::Entry(i) => buffer
                .entries
                .get(i)
                .map(|e| e.price.to_string())
                .unwrap_or_default(),
            EditField::Target(i) => buffer
                .targets
                .get(i)
                .map(|t| t.price.to_string())
                .unwrap_or_default(),
            EditField::StopLoss => buffer.stop_loss.to_string(),
            EditField::Comment => buffer.comment.clone(),
        }
    }

    pub fn move_selection(&mut self, delta: isize) {
        let len = self.fields().len() as isize;
        self.selected = (self.selected as isize + delta).rem_euclid(len) as usize;
        self.reset_input();
    }

    fn reset_input(&mut self) {
        self.input = self.value(self.selected_field());
        self.message = None;
    }

    /// Write the typed input into the buffer.
    pub fn apply_input(&mut self) -> Result<(), ClientError> {
        let input = self.input.clone();
        let result = match self.selected_field() {
            EditField::Entry(i) => self.editor.set_entry_price(i, &input),
            EditField::Target(i) => self.editor.set_target_price(i, &input),
            EditField::StopLoss => self.editor.set_stop_loss(&input),
            EditField::Comment => {
                self.editor.set_comment(input);
                Ok(())
            }
        };
        self.message = result.as_ref().err().map(|e| e.to_string());
        result
    }
}
