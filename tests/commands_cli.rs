use clap::Parser;
use insta::assert_snapshot;
use pretty_assertions::assert_eq;

use nad_tuner::{
    AmFrequency, ChannelBackend, FakeTunerProbe, FmFrequency, OutputFormat, TunerBand,
    fake_channel,
};

async fn run_with_argv<const N: usize>(
    argv: [&str; N],
) -> anyhow::Result<(String, FakeTunerProbe)> {
    let args = nad_tuner::Args::try_parse_from(argv)?;
    let tuner_config = args.tuner_config();
    let output_format = args.output_format().unwrap_or(OutputFormat::Pretty);
    let (command, backend) = args.into_command_and_backend();
    let ChannelBackend::Fake(state) = backend else {
        anyhow::bail!("command tests only drive the simulated tuner");
    };

    let (channel, probe) = fake_channel(state);
    let mut output = Vec::new();
    nad_tuner::run_with_channel(command, &mut output, channel, tuner_config, output_format)
        .await?;
    Ok((String::from_utf8(output)?, probe))
}

#[tokio::test]
async fn show_prints_fm_details() -> anyhow::Result<()> {
    let (stdout, _probe) = run_with_argv(["nad-tuner", "--fake", "show"]).await?;

    assert_snapshot!(stdout.trim_end(), @r"
    Detected tuner: NAD T743 | Power: On
    Band: FM
    FM switches (Blend: Off | Mute: Off)
    FM frequency: 96.80 MHz
    ");
    Ok(())
}

#[tokio::test]
async fn show_prints_am_frequency_on_am() -> anyhow::Result<()> {
    let (stdout, _probe) = run_with_argv([
        "nad-tuner",
        "--fake",
        "--fake-state",
        "band=am,am=558,id=C425",
        "show",
    ])
    .await?;

    assert_snapshot!(stdout.trim_end(), @r"
    Detected tuner: NAD C425 | Power: On
    Band: AM
    AM frequency: 558 kHz
    ");
    Ok(())
}

#[tokio::test]
async fn show_stops_after_power_when_off() -> anyhow::Result<()> {
    let (stdout, probe) =
        run_with_argv(["nad-tuner", "--fake", "--fake-state", "power=off", "show"]).await?;

    assert_snapshot!(stdout.trim_end(), @"Detected tuner: NAD T743 | Power: Off");
    assert_eq!(2, probe.received_frames().len());
    Ok(())
}

#[tokio::test]
async fn show_json_omits_fields_of_the_other_band() -> anyhow::Result<()> {
    let (stdout, _probe) =
        run_with_argv(["nad-tuner", "--fake", "--output", "json", "show"]).await?;

    let value: serde_json::Value = serde_json::from_str(&stdout)?;
    assert_eq!(
        serde_json::json!({
            "device_id": "T743",
            "power": "On",
            "band": "FM",
            "blend": "Off",
            "mute": "Off",
            "fm_frequency": "96.80 MHz",
        }),
        value
    );
    Ok(())
}

#[tokio::test]
async fn fm_command_retunes_and_reports_previous_frequency() -> anyhow::Result<()> {
    let (stdout, probe) = run_with_argv(["nad-tuner", "--fake", "fm", "101.1"]).await?;

    assert_snapshot!(stdout.trim_end(), @r"
    FM frequency: 101.10 MHz (was 96.80 MHz)
    Detected tuner: NAD T743 | Power: On
    Band: FM
    FM switches (Blend: Off | Mute: Off)
    FM frequency: 101.10 MHz
    ");
    assert_eq!(FmFrequency::from_centi_mhz(10110), probe.state().fm());
    Ok(())
}

#[tokio::test]
async fn fm_command_is_idempotent() -> anyhow::Result<()> {
    let (stdout, probe) = run_with_argv(["nad-tuner", "--fake", "fm", "96.80"]).await?;

    assert_snapshot!(stdout.trim_end(), @r"
    FM frequency: 96.80 MHz (already tuned)
    Detected tuner: NAD T743 | Power: On
    Band: FM
    FM switches (Blend: Off | Mute: Off)
    FM frequency: 96.80 MHz
    ");
    assert_eq!(2 + 6, probe.received_frames().len());
    Ok(())
}

#[tokio::test]
async fn am_command_switches_band_first() -> anyhow::Result<()> {
    let (stdout, probe) = run_with_argv([
        "nad-tuner",
        "--fake",
        "--settle-delay",
        "0s",
        "--output",
        "json",
        "am",
        "558",
    ])
    .await?;

    let value: serde_json::Value = serde_json::from_str(&stdout)?;
    assert_eq!(
        serde_json::json!({
            "action": "am",
            "frequency": "558 kHz",
            "retuned": true,
            "previous": "1008 kHz",
        }),
        value
    );
    assert_eq!(TunerBand::Am, probe.state().band());
    assert_eq!(AmFrequency::from_khz(558), probe.state().am());
    Ok(())
}

#[tokio::test]
async fn am_command_rejects_off_grid_frequency() {
    let result = run_with_argv(["nad-tuner", "--fake", "am", "1009"]).await;

    let error = result.expect_err("1009 kHz is off the AM grid");
    assert_eq!(
        "failed to tune to 1009 kHz: 1009 kHz is not on the 9 kHz channel grid starting at 531 kHz",
        format!("{error:#}")
    );
}

#[tokio::test]
async fn switch_commands_print_reported_state() -> anyhow::Result<()> {
    let (power, probe) =
        run_with_argv(["nad-tuner", "--fake", "power", "off"]).await?;
    assert_snapshot!(power.trim_end(), @"Power: Off");
    assert!(!probe.state().power());

    let (mute, probe) = run_with_argv(["nad-tuner", "--fake", "mute", "on"]).await?;
    assert_snapshot!(mute.trim_end(), @r"
    Mute: On
    Detected tuner: NAD T743 | Power: On
    Band: FM
    FM switches (Blend: Off | Mute: On)
    FM frequency: 96.80 MHz
    ");
    assert!(probe.state().mute());
    Ok(())
}

#[tokio::test]
async fn am_command_prints_only_its_result() -> anyhow::Result<()> {
    let (stdout, _probe) = run_with_argv([
        "nad-tuner",
        "--fake",
        "--fake-state",
        "band=am",
        "am",
        "558",
    ])
    .await?;

    assert_snapshot!(stdout.trim_end(), @"AM frequency: 558 kHz (was 1008 kHz)");
    Ok(())
}

#[tokio::test]
async fn power_on_is_followed_by_status() -> anyhow::Result<()> {
    let (stdout, probe) =
        run_with_argv(["nad-tuner", "--fake", "--fake-state", "power=off", "power", "on"])
            .await?;

    assert_snapshot!(stdout.trim_end(), @r"
    Power: On
    Detected tuner: NAD T743 | Power: On
    Band: FM
    FM switches (Blend: Off | Mute: Off)
    FM frequency: 96.80 MHz
    ");
    assert!(probe.state().power());
    Ok(())
}

#[tokio::test]
async fn band_toggle_flips_band() -> anyhow::Result<()> {
    let (stdout, probe) =
        run_with_argv(["nad-tuner", "--fake", "--settle-delay", "0s", "band", "toggle"]).await?;

    assert_snapshot!(stdout.trim_end(), @r"
    Band: AM
    Detected tuner: NAD T743 | Power: On
    Band: AM
    AM frequency: 1008 kHz
    ");
    assert_eq!(TunerBand::Am, probe.state().band());
    Ok(())
}

#[tokio::test]
async fn run_drives_the_simulated_backend_end_to_end() -> anyhow::Result<()> {
    let args = nad_tuner::Args::try_parse_from(["nad-tuner", "--fake", "blend", "on"])?;
    let tuner_config = args.tuner_config();
    let (command, backend) = args.into_command_and_backend();
    let mut output = Vec::new();

    nad_tuner::run(command, &mut output, backend, tuner_config, OutputFormat::Json).await?;

    let value: serde_json::Value = serde_json::from_slice(&output)?;
    assert_eq!(serde_json::json!({ "action": "blend", "state": "On" }), value);
    Ok(())
}
