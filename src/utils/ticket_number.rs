//! 票号格式化

/// 票号按总票数的位数零填充, 最少 3 位 (如 001, 0042)
pub fn format_ticket_number(number: i32, total_tickets: i32) -> String {
    let width = total_tickets.max(1).to_string().len().max(3);
    format!("{number:0width$}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_to_at_least_three_digits() {
        assert_eq!(format_ticket_number(1, 10), "001");
        assert_eq!(format_ticket_number(10, 10), "010");
    }

    #[test]
    fn pads_to_width_of_total() {
        assert_eq!(format_ticket_number(42, 5000), "0042");
        assert_eq!(format_ticket_number(12345, 12345), "12345");
    }

    #[test]
    fn numbers_sort_lexically() {
        let mut numbers: Vec<String> = (1..=1000).map(|n| format_ticket_number(n, 1000)).collect();
        let sorted = numbers.clone();
        numbers.sort();
        assert_eq!(numbers, sorted);
    }
}
