//! Integration tests for the application supervisor

use clicker::battery::BatteryLevel;
use clicker::buttons::ButtonEvents;
use clicker::channels::{ButtonEventChannel, LedChannel, SpeakerChannel};
use clicker::leds::Leds;
use clicker::speaker::melodies::{CLICK, SUCCESS};
use clicker::speaker::Speaker;
use clicker::supervisor::AppSupervisor;
use clicker::transport::Transport;
use clicker::types::{Button, ButtonEvent, Led, Pattern, Repeat};
use embassy_futures::block_on;

#[derive(Default)]
struct RecordingLink {
    buttons: Vec<ButtonEvent>,
    fail: bool,
}

impl Transport for RecordingLink {
    type Error = ();

    async fn report_battery(&mut self, _percent: u8) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn report_button(&mut self, event: ButtonEvent) -> Result<(), Self::Error> {
        if self.fail {
            return Err(());
        }
        self.buttons.push(event);
        Ok(())
    }
}

struct Queues {
    leds: LedChannel,
    speaker: SpeakerChannel,
    events: ButtonEventChannel,
    battery: BatteryLevel,
}

impl Queues {
    fn new() -> Self {
        Self {
            leds: LedChannel::new(),
            speaker: SpeakerChannel::new(),
            events: ButtonEventChannel::new(),
            battery: BatteryLevel::new(),
        }
    }

    fn supervisor(&self, link: RecordingLink) -> AppSupervisor<'_, RecordingLink> {
        AppSupervisor::with_handles(
            Leds::new(&self.leds),
            Speaker::new(&self.speaker),
            ButtonEvents::new(&self.events),
            &self.battery,
            link,
        )
    }
}

fn press(button: Button, is_long_press: bool) -> ButtonEvent {
    ButtonEvent {
        button,
        is_long_press,
        preceding_short_shift_presses: 0,
    }
}

#[test]
fn short_press_clicks_and_lights() {
    let queues = Queues::new();
    let mut supervisor = queues.supervisor(RecordingLink::default());

    block_on(supervisor.handle_event(press(Button::Btn1, false)));

    assert_eq!(supervisor.transport().buttons, vec![press(Button::Btn1, false)]);
    assert_eq!(supervisor.events_handled(), 1);

    let light = queues.leds.try_receive().unwrap();
    assert_eq!((light.led, light.pattern), (Led::D1, Pattern::Solid));
    let sound = queues.speaker.try_receive().unwrap();
    assert_eq!(sound.melody, Some(&CLICK[..]));
    // Lights go out when the click ends
    assert!(sound.callback.is_some());
}

#[test]
fn long_press_flashes_and_plays_success() {
    let queues = Queues::new();
    let mut supervisor = queues.supervisor(RecordingLink::default());

    block_on(supervisor.handle_event(press(Button::Btn3, true)));

    let light = queues.leds.try_receive().unwrap();
    assert_eq!(light.pattern, Pattern::Flash);
    assert_eq!(light.repeat, Repeat::Times(2));
    let sound = queues.speaker.try_receive().unwrap();
    assert_eq!(sound.melody, Some(&SUCCESS[..]));
}

#[test]
fn short_shift_only_lights_second_indicator() {
    let queues = Queues::new();
    let mut supervisor = queues.supervisor(RecordingLink::default());

    block_on(supervisor.handle_event(press(Button::Shift, false)));

    let light = queues.leds.try_receive().unwrap();
    assert_eq!(light.led, Led::D2);
    assert!(queues.speaker.is_empty());
}

#[test]
fn link_failure_still_gives_feedback() {
    let queues = Queues::new();
    let mut supervisor = queues.supervisor(RecordingLink {
        fail: true,
        ..RecordingLink::default()
    });

    block_on(supervisor.handle_event(press(Button::Btn2, false)));

    assert!(supervisor.transport().buttons.is_empty());
    assert_eq!(queues.leds.len(), 1);
    assert_eq!(queues.speaker.len(), 1);
}
