//! Token classes used by the detailed grammar.

pub const NUMBERS: &[&str] = &[
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen", "twenty",
];

pub const MONTH_ABBREVS: &[&str] = &[
    "Jan.", "Feb.", "Mar.", "Apr.", "May.", "Jun.", "Jul.", "Aug.", "Sep.", "Oct.", "Nov.",
    "Dec.",
];

pub const STATES: &[&str] = &[
    "A.L.", "A.K.", "A.Z.", "A.R.", "C.A.", "C.O.", "C.T.", "D.E.", "F.L.", "G.A.", "H.I.",
    "I.D.", "I.L.", "I.N.", "I.A.", "K.S.", "K.Y.", "L.A.", "M.E.", "M.D.", "M.A.", "M.I.",
    "M.N.", "M.S.", "M.O.", "M.T.", "N.E.", "N.V.", "N.H.", "N.J.", "N.M.", "N.Y.", "N.C.",
    "N.D.", "O.H.", "O.K.", "O.R.", "P.A.", "R.I.", "S.C.", "S.D.", "T.N.", "T.X.", "U.T.",
    "V.T.", "V.A.", "W.A.", "W.V.", "W.I.", "W.Y.",
];

/// Value of a cardinal count: a number word ("two") or digits ("2").
pub fn cardinal(token: &str) -> Option<u32> {
    let lower = token.to_lowercase();
    NUMBERS
        .iter()
        .position(|n| *n == lower)
        .map(|i| i as u32)
        .or_else(|| lower.parse().ok())
}

pub fn is_month_abbrev(token: &str) -> bool {
    MONTH_ABBREVS.contains(&token)
}

pub fn is_state(token: &str) -> bool {
    STATES.contains(&token)
}

// ── Tests ──
