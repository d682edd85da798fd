use nu_ansi_term::{Color, Style};

use crate::program::Instruction;

/// Catppuccin Mocha accents used by the REPL highlighter.
pub mod mocha {
    use nu_ansi_term::Color;

    pub const SURFACE2: Color = Color::Rgb(108, 112, 134);
    pub const RED: Color = Color::Rgb(243, 139, 168);
    pub const GREEN: Color = Color::Rgb(166, 227, 161);
    pub const YELLOW: Color = Color::Rgb(249, 226, 175);
    pub const MAUVE: Color = Color::Rgb(203, 166, 247);
    pub const PEACH: Color = Color::Rgb(250, 179, 135);
    pub const TEAL: Color = Color::Rgb(148, 226, 213);
    pub const SKY: Color = Color::Rgb(137, 220, 235);
}

/// Color for a source character.
///
/// > <   => SKY/TEAL (movement)
/// + -   => GREEN/RED (data modification)
/// . ,   => YELLOW/PEACH (I/O)
/// [ ]   => MAUVE (flow control)
pub fn color_for(ch: char) -> Color {
    match Instruction::from_symbol(ch) {
        Some(Instruction::MoveRight) => mocha::SKY,
        Some(Instruction::MoveLeft) => mocha::TEAL,
        Some(Instruction::Increment) => mocha::GREEN,
        Some(Instruction::Decrement) => mocha::RED,
        Some(Instruction::Output) => mocha::YELLOW,
        Some(Instruction::Input) => mocha::PEACH,
        Some(Instruction::LoopOpen | Instruction::LoopClose) => mocha::MAUVE,
        _ => mocha::SURFACE2,
    }
}

pub fn style_for(ch: char) -> Style {
    let style = Style::new().fg(color_for(ch));
    if Instruction::from_symbol(ch).is_some() { style.bold() } else { style }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brackets_share_a_color_and_comments_are_dim() {
        assert_eq!(color_for('['), color_for(']'));
        assert_eq!(color_for('x'), mocha::SURFACE2);
        assert_ne!(style_for('+'), style_for('x'));
    }
}
