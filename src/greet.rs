/// Greeting murni, tanpa alokasi native
pub fn greet(name: &str) -> String {
    format!("Hello, {name}!")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greet_table() {
        let cases = [
            ("World", "Hello, World!"),
            ("GO", "Hello, GO!"),
            ("", "Hello, !"),
        ];

        for (input, expected) in cases {
            assert_eq!(greet(input), expected, "greet({input:?})");
        }
    }
}
