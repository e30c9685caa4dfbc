//! Short-authentication-string token dictionary.
//!
//! A fixed, ordered table of 256 unique emoji. Each SAS byte indexes one
//! token; both peers must ship the identical table or verification is
//! meaningless.

/// Ordered SAS token table. Index with a raw SAS byte.
pub const EMOJI: [&str; 256] = [
    "🍅", "🍆", "🍇", "🍈", "🍉", "🍊", "🍋", "🍌",
    "🍍", "🍎", "🍏", "🍐", "🍑", "🍒", "🍓", "🍔",
    "🍕", "🍖", "🍗", "🍘", "🍙", "🍚", "🍛", "🍜",
    "🍝", "🍞", "🍟", "🍠", "🍡", "🍢", "🍣", "🍤",
    "🍥", "🍦", "🍧", "🍨", "🍩", "🍪", "🍫", "🍬",
    "🍭", "🍮", "🍯", "🍰", "🍱", "🍲", "🍳", "🍴",
    "🐀", "🐁", "🐂", "🐃", "🐄", "🐅", "🐆", "🐇",
    "🐈", "🐉", "🐊", "🐋", "🐌", "🐍", "🐎", "🐏",
    "🐐", "🐑", "🐒", "🐓", "🐔", "🐕", "🐖", "🐗",
    "🐘", "🐙", "🐚", "🐛", "🐜", "🐝", "🐞", "🐟",
    "🐠", "🐡", "🐢", "🐣", "🐤", "🐥", "🐦", "🐧",
    "🐨", "🐩", "🐪", "🐫", "🐬", "🐭", "🐮", "🐯",
    "🐰", "🐱", "🐲", "🐳", "🐴", "🐵", "🐶", "🐷",
    "🐸", "🐹", "🐺", "🐻", "🐼", "🐽", "🐾", "🐿",
    "😀", "😁", "😂", "😃", "😄", "😅", "😆", "😇",
    "😈", "😉", "😊", "😋", "😌", "😍", "😎", "😏",
    "😐", "😑", "😒", "😓", "😔", "😕", "😖", "😗",
    "😘", "😙", "😚", "😛", "😜", "😝", "😞", "😟",
    "😠", "😡", "😢", "😣", "😤", "😥", "😦", "😧",
    "😨", "😩", "😪", "😫", "😬", "😭", "😮", "😯",
    "🚀", "🚁", "🚂", "🚃", "🚄", "🚅", "🚆", "🚇",
    "🚈", "🚉", "🚊", "🚋", "🚌", "🚍", "🚎", "🚏",
    "🚐", "🚑", "🚒", "🚓", "🚔", "🚕", "🚖", "🚗",
    "🚘", "🚙", "🚚", "🚛", "🚜", "🚝", "🚞", "🚟",
    "💡", "💣", "💧", "💪", "💻", "💼", "💾", "💿",
    "📁", "📅", "📌", "📎", "📐", "📖", "📚", "📞",
    "📡", "📦", "📪", "📯", "📱", "📷", "📺", "📻",
    "🔋", "🔍", "🔑", "🔒", "🔔", "🔥", "🔧", "🔨",
    "⚽", "⚾", "🏀", "🏈", "🎾", "🏓", "🎯", "🎲",
    "🎳", "🎸", "🎷", "🎺", "🎻", "🥁", "🎨", "🎬",
    "☀", "☁", "☔", "⚡", "❄", "⛄", "⭐", "🌈",
    "🌊", "🌋", "🌍", "🌑", "🌕", "🌙", "🌞", "🌷",
];

/// Map raw SAS bytes to their display tokens.
pub fn sas_tokens(bytes: &[u8; 4]) -> [&'static str; 4] {
    [
        EMOJI[bytes[0] as usize],
        EMOJI[bytes[1] as usize],
        EMOJI[bytes[2] as usize],
        EMOJI[bytes[3] as usize],
    ]
}
