use gbtick_core::interrupts::{Interrupt, InterruptController};
use gbtick_core::timer::{Timer, TimerState};

/// Timer with TAC=0x05 (bit 3) whose next tick produces a falling edge and
/// overflows TIMA.
fn about_to_overflow(tma: u8) -> (Timer, InterruptController) {
    let mut t = Timer::new();
    t.div = 0x000F;
    t.write(0xFF07, 0x05);
    t.tima = 0xFF;
    t.tma = tma;
    (t, InterruptController::new())
}

fn timer_irq(ints: &InterruptController) -> bool {
    ints.is_requested(Interrupt::Timer)
}

#[test]
fn div_increment() {
    let mut t = Timer::new();
    let mut ints = InterruptController::new();
    t.step(256, &mut ints);
    assert_eq!(t.read(0xFF04), 1);
    assert!(!timer_irq(&ints));
}

#[test]
fn div_resets_on_write() {
    let mut t = Timer::new();
    t.div = 0xABCD;
    t.write(0xFF04, 0x12);
    assert_eq!(t.read(0xFF04), 0);
    assert_eq!(t.div, 0);
}

#[test]
fn div_reset_edge_tick() {
    let mut t = Timer::new();
    t.div = 0x0200; // bit 9 high
    t.write(0xFF07, 0x04);
    t.write(0xFF04, 0);
    assert_eq!(t.tima, 1);
}

#[test]
fn div_reset_without_enable_does_not_tick() {
    let mut t = Timer::new();
    t.div = 0x0200;
    t.write(0xFF07, 0x00);
    t.write(0xFF04, 0);
    assert_eq!(t.tima, 0);
}

#[test]
fn tac_disable_edge_tick() {
    let mut t = Timer::new();
    t.div = 0x0200;
    t.write(0xFF07, 0x04);
    t.write(0xFF07, 0x00);
    assert_eq!(t.tima, 1);
}

#[test]
fn tac_select_change_edge_tick() {
    let mut t = Timer::new();
    // bit 9 high, bit 3 low
    t.div = 0x0200;
    t.write(0xFF07, 0x04);
    t.write(0xFF07, 0x05);
    assert_eq!(t.tima, 1);
    assert_eq!(t.read(0xFF07), 0xFD);
}

#[test]
fn one_increment_per_falling_edge() {
    for (tac, period) in [(0x04u8, 1024u32), (0x05, 16), (0x06, 64), (0x07, 256)] {
        let mut t = Timer::new();
        let mut ints = InterruptController::new();
        t.write(0xFF07, tac);
        t.step(period - 1, &mut ints);
        assert_eq!(t.tima, 0, "TAC {tac:02X} before edge");
        t.step(1, &mut ints);
        assert_eq!(t.tima, 1, "TAC {tac:02X} at edge");
        t.step(period - 1, &mut ints);
        assert_eq!(t.tima, 1, "TAC {tac:02X} between edges");
        t.step(1, &mut ints);
        assert_eq!(t.tima, 2, "TAC {tac:02X} second edge");
    }
}

#[test]
fn disabled_timer_only_counts_div() {
    let mut t = Timer::new();
    let mut ints = InterruptController::new();
    t.write(0xFF07, 0x01);
    t.step(100_000, &mut ints);
    assert_eq!(t.tima, 0);
    assert_eq!(t.div, (100_000u32 % 0x10000) as u16);
}

#[test]
fn overflow_reload_takes_four_cycles() {
    let (mut t, mut ints) = about_to_overflow(0xAB);
    for _ in 0..4 {
        t.tick(&mut ints);
        assert_eq!(t.tima, 0x00);
        assert!(!timer_irq(&ints));
    }
    assert_eq!(t.state(), TimerState::OverflowDelay);

    t.tick(&mut ints);
    assert_eq!(t.tima, 0xAB);
    assert!(timer_irq(&ints));
    assert_eq!(t.state(), TimerState::ReloadActive);

    for _ in 0..4 {
        t.tick(&mut ints);
    }
    assert_eq!(t.state(), TimerState::Normal);
}

#[test]
fn tima_increment_and_overflow() {
    let mut t = Timer::new();
    let mut ints = InterruptController::new();
    t.write(0xFF07, 0x04);
    t.step(1024, &mut ints);
    assert_eq!(t.tima, 1);
    assert!(!timer_irq(&ints));

    t.tima = 0xFF;
    t.tma = 0xAB;
    t.step(1024, &mut ints);
    assert_eq!(t.tima, 0x00);
    assert!(!timer_irq(&ints));
    t.step(4, &mut ints);
    assert_eq!(t.tima, 0xAB);
    assert!(timer_irq(&ints));
}

#[test]
fn tima_write_during_delay_cancels_reload() {
    let (mut t, mut ints) = about_to_overflow(0xAB);
    t.tick(&mut ints);
    t.tick(&mut ints);
    t.write(0xFF05, 0x42);
    assert_eq!(t.state(), TimerState::Normal);
    t.step(8, &mut ints);
    assert_eq!(t.tima, 0x42);
    assert!(!timer_irq(&ints));
}

#[test]
fn tima_write_during_reload_ignored() {
    let (mut t, mut ints) = about_to_overflow(0xAB);
    t.step(5, &mut ints);
    assert_eq!(t.state(), TimerState::ReloadActive);
    t.write(0xFF05, 0x42);
    assert_eq!(t.tima, 0xAB);
}

#[test]
fn tma_write_during_reload_mirrors_into_tima() {
    let (mut t, mut ints) = about_to_overflow(0xAB);
    t.step(5, &mut ints);
    t.write(0xFF06, 0x33);
    assert_eq!(t.tma, 0x33);
    assert_eq!(t.tima, 0x33);
}

#[test]
fn tma_write_during_delay_used_by_reload() {
    let (mut t, mut ints) = about_to_overflow(0xAA);
    t.step(1, &mut ints);
    t.write(0xFF06, 0xBB);
    t.step(4, &mut ints);
    assert_eq!(t.tma, 0xBB);
    assert_eq!(t.tima, 0xBB);
    assert!(timer_irq(&ints));
}

#[test]
fn div_edge_during_delay_keeps_reload() {
    let (mut t, mut ints) = about_to_overflow(0xAB);
    t.step(1, &mut ints);
    // div is 0x10 now; push bit 3 high and reset it.
    t.div = 0x0018;
    t.write(0xFF04, 0);
    assert_eq!(t.tima, 0x01);
    t.step(3, &mut ints);
    assert!(!timer_irq(&ints));
    t.step(1, &mut ints);
    assert_eq!(t.tima, 0xAB);
    assert!(timer_irq(&ints));
}
