use colored::Color;

pub const PRIMARY: Color = Color::TrueColor {
    r: 120,
    g: 200,
    b: 120,
};
pub const SECONDARY: Color = Color::TrueColor {
    r: 110,
    g: 160,
    b: 220,
};
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;
pub const GOOD: Color = Color::BrightGreen;
pub const WARNING: Color = Color::Yellow;
