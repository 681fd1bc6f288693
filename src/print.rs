//! ## Printing Module
//!
//! This module is only here to make logging in the terminal easier to read.
//! It prints in appropriate colors depending on the situation, each channel gated by its
//! switch in [config], and provides a table format for an [ElevatorStatus].
use std::sync::Mutex;

use ansi_term::Colour::{self, Blue, Green, Purple, Red, Yellow};
use prettytable::{color, format, Attr, Cell, Row, Table};
use unicode_width::UnicodeWidthStr;

use crate::config;
use crate::model::{Direction, ElevatorBehaviour, ElevatorEvent, ElevatorStatus, EventKind, PassengerStatus};

/// Reads a print switch. A poisoned switch still holds a valid bool.
fn enabled(switch: &Mutex<bool>) -> bool {
    match switch.lock() {
        Ok(on) => *on,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

/// Turns every print channel on or off at once.
pub fn set_all(on: bool) {
    for switch in [
        &config::PRINT_STATUS_ON,
        &config::PRINT_ERR_ON,
        &config::PRINT_WARN_ON,
        &config::PRINT_OK_ON,
        &config::PRINT_INFO_ON,
        &config::PRINT_ELEV_ON,
    ] {
        match switch.lock() {
            Ok(mut s) => *s = on,
            Err(poisoned) => *poisoned.into_inner() = on,
        }
    }
}

/// Prints an error message in red to the terminal.
///
/// If `PRINT_ERR_ON` is `false`, the message will not be printed.
///
/// ## Terminal output
/// - "\[ERROR\]:   {}", msg
///
/// ## Example
/// ```
/// use liftdispatch::print;
///
/// print::err("Something went wrong!".to_string());
/// ```
pub fn err(msg: String) {
    if enabled(&config::PRINT_ERR_ON) {
        println!("{}{}\n", Red.paint("[ERROR]:   "), Red.paint(msg));
    }
}

/// Prints a warning message in yellow to the terminal.
///
/// If `PRINT_WARN_ON` is `false`, the message will not be printed.
///
/// ## Terminal output
/// - "\[WARNING\]: {}", msg
pub fn warn(msg: String) {
    if enabled(&config::PRINT_WARN_ON) {
        println!("{}{}\n", Yellow.paint("[WARNING]: "), Yellow.paint(msg));
    }
}

/// Prints a success message in green to the terminal.
///
/// ## Terminal output
/// - "\[OK\]:      {}", msg
pub fn ok(msg: String) {
    if enabled(&config::PRINT_OK_ON) {
        println!("{}{}\n", Green.paint("[OK]:      "), Green.paint(msg));
    }
}

/// Prints an informational message in light blue to the terminal.
///
/// ## Terminal output
/// - "\[INFO\]:    {}", msg
pub fn info(msg: String) {
    if enabled(&config::PRINT_INFO_ON) {
        let light_blue = Colour::RGB(102, 178, 255);
        println!("{}{}\n", light_blue.paint("[INFO]:    "), light_blue.paint(msg));
    }
}

/// Traces one elevator event in pink, gated by `PRINT_ELEV_ON`.
///
/// ## Terminal output
/// - "\[ELEV 1\]:  floor 3  | floor reached"
pub fn elevator(event: &ElevatorEvent) {
    if !enabled(&config::PRINT_ELEV_ON) {
        return;
    }
    let pink = Colour::RGB(255, 51, 255);
    let what = match &event.kind {
        EventKind::CallAccepted { request_id, pickup_floor, destination_floor, passengers } => format!(
            "call #{} accepted: {} rider(s) {} -> {}",
            request_id, passengers, pickup_floor, destination_floor
        ),
        EventKind::FloorReached => "floor reached".to_string(),
        EventKind::DoorsOpened => "doors open".to_string(),
        EventKind::PassengersBoarded { count } => format!("{} boarded", count),
        EventKind::PassengersAlighted { count } => format!("{} alighted", count),
        EventKind::DoorsClosed => "doors closed".to_string(),
        EventKind::Idle => "idle".to_string(),
        EventKind::Reset => "reset".to_string(),
    };
    let tag = pad_text(&format!("[ELEV {}]:", event.elevator_id), 11);
    let floor = pad_text(&format!("floor {}", event.floor), 9);
    println!("{}{}| {}", pink.paint(tag), floor, what);
}

/// Pads the input text to a fixed display width using spaces.
///
/// Accounts for characters that take more than one column, so tables stay aligned.
fn pad_text(text: &str, width: usize) -> String {
    let visible_width = UnicodeWidthStr::width(text);
    let padding = width.saturating_sub(visible_width);
    format!("{}{}", text, " ".repeat(padding))
}

fn direction_label(direction: Direction) -> String {
    match direction {
        Direction::Up => Yellow.paint("⬆ up").to_string(),
        Direction::Down => Yellow.paint("⬇ down").to_string(),
        Direction::Idle => Green.paint("idle").to_string(),
    }
}

fn behaviour_label(behaviour: ElevatorBehaviour) -> String {
    match behaviour {
        ElevatorBehaviour::Idle => Green.paint("Idle").to_string(),
        ElevatorBehaviour::Moving => Yellow.paint("Moving").to_string(),
        ElevatorBehaviour::DoorOpen => Purple.paint("Door Open").to_string(),
        ElevatorBehaviour::Stopped => Blue.paint("Stopped").to_string(),
    }
}

/// Renders the status of an elevator as two tables: the car and its stop list, then the
/// passenger queue.
pub fn status_table(status: &ElevatorStatus) -> String {
    let mut car = Table::new();
    car.set_format(*format::consts::FORMAT_BOX_CHARS);
    car.set_titles(Row::new(
        ["ID", "Floor", "Direction", "Phase", "Door", "Load", "Stops"]
            .iter()
            .map(|h| Cell::new(h).with_style(Attr::Bold).with_style(Attr::ForegroundColor(color::BRIGHT_BLUE)))
            .collect(),
    ));

    let load_color = match status.max_capacity.saturating_sub(status.current_passengers) {
        0 => Red,
        1..=2 => Yellow,
        _ => Green,
    };
    let door = if status.is_door_open {
        Yellow.paint("Open").to_string()
    } else {
        Green.paint("Closed").to_string()
    };
    let stops = status
        .stops
        .iter()
        .map(|s| format!("{}{}", if s.is_dropoff { "↓" } else { "↑" }, s.floor))
        .collect::<Vec<String>>()
        .join(" ");

    car.add_row(Row::new(vec![
        Cell::new(&status.id.to_string()),
        Cell::new(&status.current_floor.to_string()),
        Cell::new(&direction_label(status.direction)),
        Cell::new(&behaviour_label(status.behaviour)),
        Cell::new(&door),
        Cell::new(
            &load_color
                .paint(format!("{}/{}", status.current_passengers, status.max_capacity))
                .to_string(),
        ),
        Cell::new(&stops),
    ]));

    let mut queue = Table::new();
    queue.set_format(*format::consts::FORMAT_CLEAN);
    queue.set_titles(Row::new(
        ["Passenger", "Request", "From", "To", "Status"]
            .iter()
            .map(|h| Cell::new(h).with_style(Attr::Bold))
            .collect(),
    ));
    for p in &status.passenger_queue {
        let state = match p.status {
            PassengerStatus::Waiting => Yellow.paint("waiting"),
            PassengerStatus::Onboard => Green.paint("onboard"),
            PassengerStatus::Completed => Blue.paint("completed"),
            PassengerStatus::Cancelled => Red.paint("cancelled"),
        };
        queue.add_row(Row::new(vec![
            Cell::new(&p.id.to_string()),
            Cell::new(&p.request_id.to_string()),
            Cell::new(&p.pickup_floor.to_string()),
            Cell::new(&p.destination_floor.to_string()),
            Cell::new(&state.to_string()),
        ]));
    }

    if status.passenger_queue.is_empty() {
        car.to_string()
    } else {
        format!("{}{}", car, queue)
    }
}

/// Prints [status_table] under a heading, gated by `PRINT_STATUS_ON`.
pub fn status(status: &ElevatorStatus) {
    if !enabled(&config::PRINT_STATUS_ON) {
        return;
    }
    println!("{}", Purple.bold().paint(format!("ELEVATOR {} STATUS", status.id)));
    print!("{}", status_table(status));
}
